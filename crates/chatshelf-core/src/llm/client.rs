//! Completion client adapter.
//!
//! Wraps a [`BoxLlmProvider`] and turns an ordered message list into a lazy
//! stream of non-empty text fragments. Everything that is not text (connection
//! notices, stop reasons, empty deltas) is filtered out here so the turn
//! assembly only ever sees fragments, the end of the stream, or one error.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::debug;

use chatshelf_types::llm::{CompletionRequest, LlmError, Message, StreamEvent};

use super::box_provider::BoxLlmProvider;
use super::provider::EventStream;

/// Lazy, finite, non-restartable sequence of text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// Adapter between the chat controller and an LLM provider.
pub struct CompletionClient {
    provider: BoxLlmProvider,
    model: String,
    system: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

impl CompletionClient {
    pub fn new(provider: BoxLlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Prepend a system prompt to every request.
    pub fn with_system_prompt(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Default model identifier for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the request for `messages` against `model`.
    ///
    /// An empty `model` falls back to the client's configured model.
    pub fn request(&self, model: &str, messages: &[Message]) -> CompletionRequest {
        let model = if model.is_empty() { &self.model } else { model };
        CompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            system: self.system.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Submit `messages` and return the reply as a fragment stream.
    ///
    /// Each call issues a fresh request; fragments are pulled as the caller
    /// polls the stream.
    pub fn submit(&self, model: &str, messages: &[Message]) -> FragmentStream {
        debug!(
            provider = self.provider.name(),
            model,
            messages = messages.len(),
            "Submitting completion request"
        );
        text_fragments(self.provider.stream(self.request(model, messages)))
    }
}

/// Reduce a provider event stream to its non-empty text deltas.
///
/// The first error ends the stream. `Done` ends it early even if the
/// provider would keep yielding.
pub fn text_fragments(events: EventStream) -> FragmentStream {
    Box::pin(async_stream::try_stream! {
        let mut events = events;
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::TextDelta { text } => {
                    if !text.is_empty() {
                        yield text;
                    }
                }
                StreamEvent::MessageDelta { stop_reason } => {
                    debug!(%stop_reason, "Provider finished message");
                }
                StreamEvent::Connected => {}
                StreamEvent::Done => break,
            }
        }
    })
}
