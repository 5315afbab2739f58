//! HistoryStore trait definition.
//!
//! The store is a durable key-value map with two keys: the full session
//! mapping and the legacy single-conversation transcript. Both are read and
//! written whole; there are no partial updates.

use chatshelf_types::chat::{HistoryMap, Message};
use chatshelf_types::error::StoreError;

/// Trait for chat-history persistence.
///
/// Implementations live in chatshelf-infra (e.g., `SqliteHistoryStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait HistoryStore: Send + Sync {
    /// Load every stored session. A missing or empty store yields an empty map.
    fn load(&self) -> impl std::future::Future<Output = Result<HistoryMap, StoreError>> + Send;

    /// Replace the stored mapping with `histories`.
    ///
    /// Atomic from the caller's view: readers see either the old or the new
    /// mapping, never a mix.
    fn save(
        &self,
        histories: &HistoryMap,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Load the single-conversation transcript (empty if never written).
    fn load_transcript(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, StoreError>> + Send;

    /// Replace the single-conversation transcript.
    fn save_transcript(
        &self,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
