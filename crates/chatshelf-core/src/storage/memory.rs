//! In-memory [`HistoryStore`] for ephemeral runs and tests.
//!
//! Test builds add fault injection and write counters for storage-error paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Mutex;

use chatshelf_types::chat::{HistoryMap, Message};
use chatshelf_types::error::StoreError;

use super::history_store::HistoryStore;

/// Volatile store; contents vanish with the process.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    histories: Mutex<Option<HistoryMap>>,
    transcript: Mutex<Vec<Message>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing mapping, as if it had been persisted earlier.
    pub fn with_histories(histories: HistoryMap) -> Self {
        Self {
            histories: Mutex::new(Some(histories)),
            ..Self::default()
        }
    }

    /// Make every subsequent `load` fail.
    #[cfg(test)]
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `save`/`save_transcript` fail.
    #[cfg(test)]
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    #[cfg(test)]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored mapping (`None` if never written).
    #[cfg(test)]
    pub async fn snapshot(&self) -> Option<HistoryMap> {
        self.histories.lock().await.clone()
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl HistoryStore for InMemoryHistoryStore {
    async fn load(&self) -> Result<HistoryMap, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Query("store is unreadable".to_string()));
        }
        Ok(self.histories.lock().await.clone().unwrap_or_default())
    }

    async fn save(&self, histories: &HistoryMap) -> Result<(), StoreError> {
        self.check_write()?;
        *self.histories.lock().await = Some(histories.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_transcript(&self) -> Result<Vec<Message>, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Query("store is unreadable".to_string()));
        }
        Ok(self.transcript.lock().await.clone())
    }

    async fn save_transcript(&self, messages: &[Message]) -> Result<(), StoreError> {
        self.check_write()?;
        *self.transcript.lock().await = messages.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
