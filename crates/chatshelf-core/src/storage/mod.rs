//! Storage abstractions for chat history.
//!
//! Defines the [`history_store::HistoryStore`] trait plus an in-memory
//! implementation. Durable implementations live in chatshelf-infra.

pub mod history_store;
pub mod memory;
