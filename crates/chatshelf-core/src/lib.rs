//! Session registry, chat controller, and port traits for chatshelf.
//!
//! This crate defines the "ports" (store and provider traits) that the
//! infrastructure layer implements. It depends only on `chatshelf-types` --
//! never on `chatshelf-infra` or any database/HTTP crate.

pub mod chat;
pub mod llm;
pub mod storage;
