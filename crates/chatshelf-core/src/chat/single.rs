//! Single-conversation mode over the legacy transcript key.
//!
//! One running transcript, no sessions. Turns follow the same state machine
//! as the multi-session controller, and an unreadable transcript is likewise
//! never overwritten.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chatshelf_types::chat::Message;
use chatshelf_types::error::{StoreError, TurnError};

use crate::llm::client::CompletionClient;
use crate::storage::history_store::HistoryStore;

use super::observer::{TurnObserver, TurnPhase};
use super::turn::{PhaseTracker, stream_reply};

/// Outcome of a settled turn in single-conversation mode.
#[derive(Debug)]
pub struct TranscriptReply {
    pub reply: String,
    pub fragments: usize,
    pub elapsed: Duration,
    pub persist_error: Option<StoreError>,
}

pub struct SingleConversation<S: HistoryStore> {
    store: S,
    client: CompletionClient,
    messages: Vec<Message>,
    request_timeout: Duration,
    transcript_unloaded: bool,
}

impl<S: HistoryStore> SingleConversation<S> {
    /// Load the stored transcript. An unreadable store starts empty, the error
    /// is handed back, and later writes are refused.
    pub async fn load(
        store: S,
        client: CompletionClient,
        request_timeout: Duration,
    ) -> (Self, Option<StoreError>) {
        let (messages, error) = match store.load_transcript().await {
            Ok(messages) => (messages, None),
            Err(err) => {
                warn!(error = %err, "Failed to load transcript, continuing in memory only");
                (Vec::new(), Some(err))
            }
        };
        info!(messages = messages.len(), "Transcript loaded");
        let transcript_unloaded = error.is_some();
        (
            Self {
                store,
                client,
                messages,
                request_timeout,
                transcript_unloaded,
            },
            error,
        )
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Forget the transcript, in memory and in the store.
    pub async fn reset(&mut self) -> Result<(), StoreError> {
        let removed = self.messages.len();
        self.messages.clear();
        self.persist().await?;
        info!(removed, "Transcript cleared");
        Ok(())
    }

    pub async fn send<O: TurnObserver + ?Sized>(
        &mut self,
        prompt: &str,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> Result<TranscriptReply, TurnError> {
        if prompt.trim().is_empty() {
            return Err(TurnError::EmptyPrompt);
        }

        self.messages.push(Message::user(prompt));

        let mut tracker = PhaseTracker::new(observer);
        tracker.advance(TurnPhase::AwaitingCompletion);

        let result = stream_reply(
            &self.client,
            self.client.model(),
            &self.messages,
            &mut tracker,
            cancel,
            self.request_timeout,
        )
        .await;

        match result {
            Ok(assembled) => {
                self.messages
                    .push(Message::assistant(assembled.text.clone()));
                tracker.advance(TurnPhase::Settled);
                let persist_error = self.persist().await.err();
                tracker.advance(TurnPhase::Idle);
                Ok(TranscriptReply {
                    reply: assembled.text,
                    fragments: assembled.fragments,
                    elapsed: assembled.elapsed,
                    persist_error,
                })
            }
            Err(err) => {
                warn!(error = %err, "Turn failed");
                tracker.advance(TurnPhase::Failed);
                tracker.advance(TurnPhase::Idle);
                Err(err)
            }
        }
    }

    async fn persist(&self) -> Result<(), StoreError> {
        if self.transcript_unloaded {
            warn!("Transcript was not loaded, refusing to overwrite it");
            return Err(StoreError::NotLoaded);
        }
        if let Err(err) = self.store.save_transcript(&self.messages).await {
            warn!(error = %err, "Failed to persist transcript");
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::observer::SilentObserver;
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::llm::scripted::{ScriptStep, ScriptedProvider};
    use crate::storage::memory::InMemoryHistoryStore;

    async fn conversation(
        store: InMemoryHistoryStore,
        provider: ScriptedProvider,
    ) -> SingleConversation<InMemoryHistoryStore> {
        let client = CompletionClient::new(BoxLlmProvider::new(provider), "m");
        let (conversation, error) =
            SingleConversation::load(store, client, Duration::from_secs(5)).await;
        assert!(error.is_none());
        conversation
    }

    #[tokio::test]
    async fn test_turn_appends_and_persists_transcript() {
        let mut single = conversation(
            InMemoryHistoryStore::new(),
            ScriptedProvider::replying(&["Hi", " there"]),
        )
        .await;

        let reply = single
            .send("hello", &mut SilentObserver, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.reply, "Hi there");
        assert!(reply.persist_error.is_none());
        assert_eq!(
            single.messages(),
            &[Message::user("hello"), Message::assistant("Hi there")]
        );
        assert_eq!(single.store().load_transcript().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_turn_is_not_persisted() {
        let mut single = conversation(
            InMemoryHistoryStore::new(),
            ScriptedProvider::new(vec![ScriptStep::Fail("nope".to_string())]),
        )
        .await;

        let err = single
            .send("hello", &mut SilentObserver, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Provider(_)));
        assert_eq!(single.messages(), &[Message::user("hello")]);
        assert!(single.store().load_transcript().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_store() {
        let mut single = conversation(
            InMemoryHistoryStore::new(),
            ScriptedProvider::replying(&["ok"]),
        )
        .await;
        single
            .send("hello", &mut SilentObserver, &CancellationToken::new())
            .await
            .unwrap();

        single.reset().await.unwrap();
        assert!(single.messages().is_empty());
        assert!(single.store().load_transcript().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_store_starts_empty() {
        let store = InMemoryHistoryStore::new();
        store.fail_loads(true);
        let client = CompletionClient::new(
            BoxLlmProvider::new(ScriptedProvider::replying(&[])),
            "m",
        );
        let (single, error) = SingleConversation::load(store, client, Duration::from_secs(5)).await;
        assert!(error.is_some());
        assert!(single.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_transcript_is_never_overwritten() {
        let store = InMemoryHistoryStore::new();
        store
            .save_transcript(&[Message::user("older"), Message::assistant("reply")])
            .await
            .unwrap();
        store.fail_loads(true);
        let client = CompletionClient::new(
            BoxLlmProvider::new(ScriptedProvider::replying(&["ok"])),
            "m",
        );
        let (mut single, _) =
            SingleConversation::load(store, client, Duration::from_secs(5)).await;

        let reply = single
            .send("hello", &mut SilentObserver, &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(reply.persist_error, Some(StoreError::NotLoaded)));
        assert!(matches!(single.reset().await, Err(StoreError::NotLoaded)));

        assert_eq!(single.store().save_count(), 1);
        single.store().fail_loads(false);
        assert_eq!(
            single.store().load_transcript().await.unwrap(),
            vec![Message::user("older"), Message::assistant("reply")]
        );
    }
}
