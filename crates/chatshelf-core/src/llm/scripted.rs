//! Scripted provider used by the core test suites.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chatshelf_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent,
};

use super::provider::{EventStream, LlmProvider};

#[derive(Clone, Debug)]
pub enum ScriptStep {
    Event(StreamEvent),
    Fail(String),
    /// Never yields; used for timeout and cancellation tests.
    Stall,
}

/// Replays the same script on every `stream` call.
pub struct ScriptedProvider {
    script: Vec<ScriptStep>,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Script that streams `fragments` as text deltas then finishes.
    pub fn replying(fragments: &[&str]) -> Self {
        let mut script: Vec<ScriptStep> = fragments
            .iter()
            .map(|text| {
                ScriptStep::Event(StreamEvent::TextDelta {
                    text: text.to_string(),
                })
            })
            .collect();
        script.push(ScriptStep::Event(StreamEvent::Done));
        Self::new(script)
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn last_request(&self) -> Arc<Mutex<Option<CompletionRequest>>> {
        Arc::clone(&self.last_request)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: "ok".to_string(),
            model: "scripted-model".to_string(),
            stop_reason: StopReason::EndTurn,
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        let script = self.script.clone();
        Box::pin(async_stream::stream! {
            for step in script {
                match step {
                    ScriptStep::Event(event) => yield Ok(event),
                    ScriptStep::Fail(message) => {
                        yield Err(LlmError::Stream(message));
                        break;
                    }
                    ScriptStep::Stall => futures_util::future::pending::<()>().await,
                }
            }
        })
    }
}
