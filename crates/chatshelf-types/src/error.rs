use thiserror::Error;

use crate::llm::LlmError;

/// Errors from history store operations (used by the trait in chatshelf-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("stored history could not be read at startup; changes are kept in memory only")]
    NotLoaded,
}

/// Errors from session-management operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("malformed session identifier '{id}': {reason}")]
    MalformedIdentifier { id: String, reason: String },

    #[error("unreadable stored session '{id}': {reason}")]
    UnreadableEntry { id: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Why a chat turn ended in the failed state.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyPrompt,

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("no response from the provider within {secs}s")]
    Timeout { secs: u64 },

    #[error("response cancelled")]
    Cancelled,
}
