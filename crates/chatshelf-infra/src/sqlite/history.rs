//! SQLite history store.
//!
//! Implements `HistoryStore` from `chatshelf-core` on top of the `kv_store`
//! table. Each key holds one JSON document that is read and replaced whole.

use chrono::Utc;
use sqlx::Row;
use tracing::debug;

use chatshelf_core::storage::history_store::HistoryStore;
use chatshelf_types::chat::{HistoryMap, Message};
use chatshelf_types::error::StoreError;

use super::pool::DatabasePool;

/// Key holding every chat session.
pub const HISTORIES_KEY: &str = "histories";

/// Key holding the single-conversation transcript.
pub const TRANSCRIPT_KEY: &str = "messages";

/// SQLite-backed implementation of `HistoryStore`.
pub struct SqliteHistoryStore {
    pool: DatabasePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn get_document(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    /// Upsert `value` under `key` in a single statement.
    async fn put_document(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO kv_store (key, value, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        debug!(key, bytes = value.len(), "Document written");
        Ok(())
    }
}

impl HistoryStore for SqliteHistoryStore {
    async fn load(&self) -> Result<HistoryMap, StoreError> {
        match self.get_document(HISTORIES_KEY).await? {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::Serialization(format!("invalid histories document: {e}"))),
            None => Ok(HistoryMap::new()),
        }
    }

    async fn save(&self, histories: &HistoryMap) -> Result<(), StoreError> {
        let text = serde_json::to_string(histories)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.put_document(HISTORIES_KEY, &text).await
    }

    async fn load_transcript(&self) -> Result<Vec<Message>, StoreError> {
        match self.get_document(TRANSCRIPT_KEY).await? {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::Serialization(format!("invalid transcript document: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn save_transcript(&self, messages: &[Message]) -> Result<(), StoreError> {
        let text = serde_json::to_string(messages)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.put_document(TRANSCRIPT_KEY, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatshelf_types::chat::{Session, StoredSession};
    use chrono::TimeZone;

    async fn open_store(dir: &tempfile::TempDir) -> SqliteHistoryStore {
        let pool = DatabasePool::open_in(dir.path()).await.unwrap();
        SqliteHistoryStore::new(pool)
    }

    fn sample() -> HistoryMap {
        let created = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        let mut session = Session::new("Chat 2026-01-15 10:00:00", created);
        session.messages.push(Message::user("hi"));
        session.messages.push(Message::assistant("hello"));

        let mut map = HistoryMap::new();
        map.insert(session.id.clone(), StoredSession::from(&session));
        map.insert(
            "Chat 2026-01-14 08:00:00".to_string(),
            StoredSession::Legacy(vec![Message::user("old")]),
        );
        map
    }

    #[tokio::test]
    async fn test_empty_store_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        assert!(store.load().await.unwrap().is_empty());
        assert!(store.load_transcript().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let map = sample();

        store.save(&map).await.unwrap();
        assert_eq!(store.load().await.unwrap(), map);
    }

    #[tokio::test]
    async fn test_save_overwrites_whole_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.save(&sample()).await.unwrap();

        let mut smaller = HistoryMap::new();
        smaller.insert(
            "Chat 2026-02-01 12:00:00".to_string(),
            StoredSession::Legacy(vec![]),
        );
        store.save(&smaller).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("Chat 2026-02-01 12:00:00"));
    }

    #[tokio::test]
    async fn test_resave_of_loaded_mapping_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store
            .put_document(
                HISTORIES_KEY,
                r#"{"Chat 2026-01-14 08:00:00":[{"role":"user","content":"old"}],"notes":[]}"#,
            )
            .await
            .unwrap();
        let before: serde_json::Value =
            serde_json::from_str(&store.get_document(HISTORIES_KEY).await.unwrap().unwrap())
                .unwrap();

        let loaded = store.load().await.unwrap();
        store.save(&loaded).await.unwrap();

        let after: serde_json::Value =
            serde_json::from_str(&store.get_document(HISTORIES_KEY).await.unwrap().unwrap())
                .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_one_bad_entry_does_not_fail_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let document = r#"{"Chat 2026-01-14 08:00:00":[{"role":"user","content":"old"}],"Chat 2026-01-14 09:00:00":{"oops":true}}"#;
        store.put_document(HISTORIES_KEY, document).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(matches!(
            loaded["Chat 2026-01-14 09:00:00"],
            StoredSession::Unreadable(_)
        ));

        store.save(&loaded).await.unwrap();
        let after: serde_json::Value =
            serde_json::from_str(&store.get_document(HISTORIES_KEY).await.unwrap().unwrap())
                .unwrap();
        let before: serde_json::Value = serde_json::from_str(document).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.put_document(HISTORIES_KEY, "not json").await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_transcript_is_independent_of_histories() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.save(&sample()).await.unwrap();

        let transcript = vec![Message::user("ping"), Message::assistant("pong")];
        store.save_transcript(&transcript).await.unwrap();

        assert_eq!(store.load_transcript().await.unwrap(), transcript);
        assert_eq!(store.load().await.unwrap(), sample());

        store.save_transcript(&[]).await.unwrap();
        assert!(store.load_transcript().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(&dir).await;
            store.save(&sample()).await.unwrap();
        }
        let store = open_store(&dir).await;
        assert_eq!(store.load().await.unwrap(), sample());
    }
}
