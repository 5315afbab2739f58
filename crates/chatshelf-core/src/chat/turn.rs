//! Streaming assembly for one chat turn.
//!
//! Pulls fragments from the completion client, folds them into a single
//! buffer and reports progress to the observer. Bounded by a per-fragment
//! timeout and abortable through a [`CancellationToken`].

use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chatshelf_types::chat::Message;
use chatshelf_types::error::TurnError;

use crate::llm::client::CompletionClient;

use super::observer::{TurnObserver, TurnPhase};

/// Assembled reply of a turn that reached `Settled`.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub text: String,
    pub fragments: usize,
    pub elapsed: Duration,
}

/// Tracks the turn phase, logs transitions and forwards them to the observer.
pub struct PhaseTracker<'a, O: TurnObserver + ?Sized> {
    phase: TurnPhase,
    observer: &'a mut O,
}

impl<'a, O: TurnObserver + ?Sized> PhaseTracker<'a, O> {
    pub fn new(observer: &'a mut O) -> Self {
        Self {
            phase: TurnPhase::Idle,
            observer,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn advance(&mut self, next: TurnPhase) {
        if !self.phase.can_transition_to(next) {
            warn!(from = %self.phase, to = %next, "Unexpected turn transition");
        }
        debug!(from = %self.phase, to = %next, "Turn phase");
        self.phase = next;
        self.observer.on_phase(next);
    }

    fn fragment(&mut self, fragment: &str) {
        self.observer.on_fragment(fragment);
    }
}

/// Stream a reply to `history` and return the assembled text.
///
/// Expects the tracker in `AwaitingCompletion` and moves it to `Streaming`
/// when the first fragment (or the end of an empty reply) arrives. Leaves it
/// in `Streaming` on success; the caller owns the terminal transition. On
/// error the partial buffer is dropped.
pub async fn stream_reply<O: TurnObserver + ?Sized>(
    client: &CompletionClient,
    model: &str,
    history: &[Message],
    tracker: &mut PhaseTracker<'_, O>,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<Assembled, TurnError> {
    let started = Instant::now();
    let mut fragments = client.submit(model, history);

    let mut buffer = String::new();
    let mut count = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
            next = tokio::time::timeout(timeout, fragments.next()) => next,
        };

        match next {
            Err(_) => {
                return Err(TurnError::Timeout {
                    secs: timeout.as_secs(),
                });
            }
            Ok(None) => {
                if tracker.phase() == TurnPhase::AwaitingCompletion {
                    tracker.advance(TurnPhase::Streaming);
                }
                break;
            }
            Ok(Some(Err(err))) => return Err(TurnError::Provider(err)),
            Ok(Some(Ok(fragment))) => {
                if tracker.phase() == TurnPhase::AwaitingCompletion {
                    tracker.advance(TurnPhase::Streaming);
                }
                buffer.push_str(&fragment);
                count += 1;
                tracker.fragment(&fragment);
            }
        }
    }

    Ok(Assembled {
        text: buffer,
        fragments: count,
        elapsed: started.elapsed(),
    })
}
