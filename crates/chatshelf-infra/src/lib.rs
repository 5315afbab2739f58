//! Infrastructure layer for chatshelf.
//!
//! Implementations of the traits defined in `chatshelf-core`: SQLite history
//! storage, the OpenAI-compatible LLM provider, and config/data-dir loading.

pub mod config;
pub mod llm;
pub mod sqlite;
