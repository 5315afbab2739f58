//! Shared domain types for chatshelf.
//!
//! Sessions, messages, the stored history format, LLM request/stream shapes,
//! configuration, and the error taxonomy shared by every other crate.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
