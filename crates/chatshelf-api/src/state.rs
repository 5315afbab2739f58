//! Application state wiring config, storage and the LLM provider together.
//!
//! `AppState` resolves the data directory and configuration once; the chat
//! front-ends then open the store and build the completion client from it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};

use chatshelf_core::llm::box_provider::BoxLlmProvider;
use chatshelf_core::llm::client::CompletionClient;
use chatshelf_core::storage::history_store::HistoryStore;
use chatshelf_core::storage::memory::InMemoryHistoryStore;
use chatshelf_infra::config::{
    load_global_config, resolve_api_key, resolve_data_dir, resolve_request_timeout,
};
use chatshelf_infra::llm::create_provider;
use chatshelf_infra::sqlite::history::SqliteHistoryStore;
use chatshelf_infra::sqlite::pool::DatabasePool;
use chatshelf_types::chat::{HistoryMap, Message};
use chatshelf_types::config::GlobalConfig;
use chatshelf_types::error::StoreError;

/// History store selected at startup: SQLite on disk, or memory for
/// `--ephemeral` runs.
pub enum ShelfStore {
    Sqlite(SqliteHistoryStore),
    Memory(InMemoryHistoryStore),
}

impl HistoryStore for ShelfStore {
    async fn load(&self) -> Result<HistoryMap, StoreError> {
        match self {
            ShelfStore::Sqlite(store) => store.load().await,
            ShelfStore::Memory(store) => store.load().await,
        }
    }

    async fn save(&self, histories: &HistoryMap) -> Result<(), StoreError> {
        match self {
            ShelfStore::Sqlite(store) => store.save(histories).await,
            ShelfStore::Memory(store) => store.save(histories).await,
        }
    }

    async fn load_transcript(&self) -> Result<Vec<Message>, StoreError> {
        match self {
            ShelfStore::Sqlite(store) => store.load_transcript().await,
            ShelfStore::Memory(store) => store.load_transcript().await,
        }
    }

    async fn save_transcript(&self, messages: &[Message]) -> Result<(), StoreError> {
        match self {
            ShelfStore::Sqlite(store) => store.save_transcript(messages).await,
            ShelfStore::Memory(store) => store.save_transcript(messages).await,
        }
    }
}

/// Resolved runtime settings shared by every command.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: GlobalConfig,
    pub ephemeral: bool,
}

impl AppState {
    /// Resolve the data directory and load `config.toml`.
    ///
    /// `model_override` (from `--model`) replaces the configured model.
    pub async fn init(model_override: Option<String>, ephemeral: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let mut config = load_global_config(&data_dir).await;
        if let Some(model) = model_override {
            config.model = model;
        }
        debug!(data_dir = %data_dir.display(), model = %config.model, ephemeral, "App state initialized");

        Ok(Self {
            data_dir,
            config,
            ephemeral,
        })
    }

    /// Open the history store for this run.
    pub async fn open_store(&self) -> anyhow::Result<ShelfStore> {
        if self.ephemeral {
            info!("Using in-memory history store");
            return Ok(ShelfStore::Memory(InMemoryHistoryStore::new()));
        }

        let pool = DatabasePool::open_in(&self.data_dir)
            .await
            .with_context(|| format!("Failed to open database in {}", self.data_dir.display()))?;
        Ok(ShelfStore::Sqlite(SqliteHistoryStore::new(pool)))
    }

    /// Build the configured provider, reading the API key from the environment.
    pub fn provider(&self) -> anyhow::Result<BoxLlmProvider> {
        let api_key = resolve_api_key(&self.config.provider)?;
        let provider = create_provider(&self.config.provider, &self.config.model, api_key)?;
        Ok(provider)
    }

    /// Completion client carrying the configured model and request settings.
    pub fn completion_client(&self) -> anyhow::Result<CompletionClient> {
        Ok(CompletionClient::new(self.provider()?, self.config.model.clone())
            .with_system_prompt(self.config.system_prompt.clone())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature))
    }

    pub fn request_timeout(&self) -> Duration {
        resolve_request_timeout(&self.config)
    }
}
