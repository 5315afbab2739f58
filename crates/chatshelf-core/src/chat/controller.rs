//! Chat controller: owns the session registry, the active-session selection,
//! the history store and the completion client.
//!
//! Every session-management operation applies its change in memory first and
//! then flushes the whole registry to the store. A failed flush is returned to
//! the caller but never rolls the in-memory change back. Chat turns defer
//! persistence until the reply has settled, so a failed turn leaves storage
//! exactly as it was.
//!
//! If the store could not be read at startup the controller runs from memory
//! only: every flush is refused with [`StoreError::NotLoaded`] so the history
//! that failed to load is never overwritten.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chatshelf_types::chat::{Message, Session};
use chatshelf_types::error::{ChatError, StoreError, TurnError};

use crate::llm::client::CompletionClient;
use crate::storage::history_store::HistoryStore;

use super::observer::{TurnObserver, TurnPhase};
use super::registry::SessionRegistry;
use super::turn::{PhaseTracker, stream_reply};

/// What happened while the controller started up.
#[derive(Debug, Default)]
pub struct StartupReport {
    /// Identifier of the session minted because the registry was empty.
    pub created_session: Option<String>,
    /// The store could not be read; the controller started empty and will
    /// not write to it.
    pub storage_error: Option<StoreError>,
    /// The initial flush after minting a session failed.
    pub persist_error: Option<StoreError>,
    /// Stored entries quarantined for malformed identifiers.
    pub malformed: Vec<ChatError>,
}

/// Outcome of a settled chat turn.
#[derive(Debug)]
pub struct TurnReport {
    pub session_id: String,
    pub reply: String,
    pub fragments: usize,
    pub elapsed: Duration,
    /// Set when the reply was kept in memory but could not be written.
    pub persist_error: Option<StoreError>,
}

pub struct ChatController<S: HistoryStore> {
    store: S,
    client: CompletionClient,
    registry: SessionRegistry,
    selected: String,
    request_timeout: Duration,
    history_unloaded: bool,
}

impl<S: HistoryStore> ChatController<S> {
    /// Load the registry from `store` and select the most recent session.
    ///
    /// Never fails: an unreadable store degrades to an empty, memory-only
    /// registry. An empty registry gets one fresh session that is selected
    /// and, when the store was read, persisted.
    pub async fn start(
        store: S,
        client: CompletionClient,
        request_timeout: Duration,
    ) -> (Self, StartupReport) {
        let mut report = StartupReport::default();

        let registry = match store.load().await {
            Ok(histories) => {
                let load = SessionRegistry::from_stored(histories);
                report.malformed = load.malformed;
                load.registry
            }
            Err(err) => {
                warn!(error = %err, "Failed to load chat history, continuing in memory only");
                report.storage_error = Some(err);
                SessionRegistry::new()
            }
        };

        let history_unloaded = report.storage_error.is_some();
        let selected = registry
            .most_recent()
            .map(|s| s.id.clone())
            .unwrap_or_default();

        let mut controller = Self {
            store,
            client,
            registry,
            selected,
            request_timeout,
            history_unloaded,
        };

        if controller.registry.is_empty() {
            let session = controller.registry.create();
            let id = session.id.clone();
            controller.registry.insert_front(session);
            controller.selected = id.clone();
            info!(session_id = %id, "Created initial session");
            if !controller.history_unloaded {
                report.persist_error = controller.persist().await.err();
            }
            report.created_session = Some(id);
        }

        info!(
            sessions = controller.registry.len(),
            selected = %controller.selected,
            "Chat controller ready"
        );
        (controller, report)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn selected_id(&self) -> &str {
        &self.selected
    }

    /// The selected session. `None` only if the selection has gone stale and
    /// has not been healed yet.
    pub fn current(&self) -> Option<&Session> {
        self.registry.get(&self.selected)
    }

    /// Sessions most recent first.
    pub fn sessions(&self) -> Vec<&Session> {
        self.registry.list_ordered_by_recency()
    }

    /// Create an empty session, place it first and select it.
    pub async fn new_session(&mut self) -> Result<String, ChatError> {
        let session = self.registry.create();
        let id = session.id.clone();
        self.registry.insert_front(session);
        self.selected = id.clone();
        info!(session_id = %id, "Session created");
        self.persist().await?;
        Ok(id)
    }

    /// Select an existing session. Selection is not persisted.
    pub fn select(&mut self, id: &str) -> Result<(), ChatError> {
        if !self.registry.contains(id) {
            return Err(ChatError::SessionNotFound(id.to_string()));
        }
        self.selected = id.to_string();
        Ok(())
    }

    /// Delete the selected session. Returns the identifier selected afterwards.
    pub async fn delete_current(&mut self) -> Result<String, ChatError> {
        let id = self.selected.clone();
        self.delete_session(&id).await
    }

    /// Delete `id`. If it was selected, the most recent remaining session is
    /// selected, or a fresh one is created when none remain.
    ///
    /// Returns the identifier selected afterwards.
    pub async fn delete_session(&mut self, id: &str) -> Result<String, ChatError> {
        if self.registry.delete(id).is_none() {
            return Err(ChatError::SessionNotFound(id.to_string()));
        }
        info!(session_id = %id, "Session deleted");

        if self.selected == id {
            self.selected = match self.registry.most_recent() {
                Some(session) => session.id.clone(),
                None => {
                    let session = self.registry.create();
                    let fresh = session.id.clone();
                    self.registry.insert_front(session);
                    info!(session_id = %fresh, "Created replacement session");
                    fresh
                }
            };
        }

        self.persist().await?;
        Ok(self.selected.clone())
    }

    /// Remove every session and select the single fresh one left behind.
    pub async fn clear_all(&mut self) -> Result<String, ChatError> {
        let removed = self.registry.len();
        let id = self.registry.clear_all();
        self.selected = id.clone();
        info!(removed, session_id = %id, "Cleared all sessions");
        self.persist().await?;
        Ok(id)
    }

    /// Run one chat turn against the selected session.
    ///
    /// The user message is appended in memory before the request is issued
    /// and stays there whatever the outcome. On success the assembled reply is
    /// appended and the registry is persisted; on failure nothing is written.
    pub async fn send<O: TurnObserver + ?Sized>(
        &mut self,
        prompt: &str,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, TurnError> {
        if prompt.trim().is_empty() {
            return Err(TurnError::EmptyPrompt);
        }

        self.heal_selection();
        let session_id = self.selected.clone();
        let session = self.registry.get_or_create(&session_id);
        session.messages.push(Message::user(prompt));
        let history = session.messages.clone();

        let mut tracker = PhaseTracker::new(observer);
        tracker.advance(TurnPhase::AwaitingCompletion);

        let model = self.client.model().to_string();
        let result = stream_reply(
            &self.client,
            &model,
            &history,
            &mut tracker,
            cancel,
            self.request_timeout,
        )
        .await;

        match result {
            Ok(assembled) => {
                if let Some(session) = self.registry.get_mut(&session_id) {
                    session.messages.push(Message::assistant(assembled.text.clone()));
                }
                tracker.advance(TurnPhase::Settled);

                let persist_error = self.persist().await.err();
                info!(
                    session_id = %session_id,
                    fragments = assembled.fragments,
                    elapsed_ms = assembled.elapsed.as_millis() as u64,
                    "Turn settled"
                );
                tracker.advance(TurnPhase::Idle);

                Ok(TurnReport {
                    session_id,
                    reply: assembled.text,
                    fragments: assembled.fragments,
                    elapsed: assembled.elapsed,
                    persist_error,
                })
            }
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Turn failed");
                tracker.advance(TurnPhase::Failed);
                tracker.advance(TurnPhase::Idle);
                Err(err)
            }
        }
    }

    /// Re-point a stale selection at a freshly created session.
    ///
    /// Returns `true` if a session was created. Not persisted here; the
    /// caller's next flush writes it.
    fn heal_selection(&mut self) -> bool {
        if self.registry.contains(&self.selected) {
            return false;
        }
        let id = self.registry.get_or_create(&self.selected).id.clone();
        info!(stale = %self.selected, session_id = %id, "Selection healed with new session");
        self.selected = id;
        true
    }

    #[cfg(test)]
    fn force_select(&mut self, id: &str) {
        self.selected = id.to_string();
    }

    async fn persist(&self) -> Result<(), StoreError> {
        if self.history_unloaded {
            warn!("Chat history was not loaded, refusing to overwrite it");
            return Err(StoreError::NotLoaded);
        }
        let stored = self.registry.to_stored();
        if let Err(err) = self.store.save(&stored).await {
            warn!(error = %err, "Failed to persist chat history");
            return Err(err);
        }
        Ok(())
    }
}
