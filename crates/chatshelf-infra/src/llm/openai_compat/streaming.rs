//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai` chunk streams to the provider-agnostic [`StreamEvent`]
//! enum. Only `choices[].delta.content` carries text; chunks without it
//! produce no text event.

use futures_util::{Stream, StreamExt};

use async_openai::error::OpenAIError;
use async_openai::types::chat::{CreateChatCompletionStreamResponse, FinishReason};

use chatshelf_core::llm::provider::EventStream;
use chatshelf_types::llm::{LlmError, StopReason, StreamEvent};

/// Map a stream of OpenAI chat-completion chunks to [`StreamEvent`]s.
///
/// Emits `Connected` first, then `TextDelta` for every non-empty content
/// delta, `MessageDelta` when a finish reason appears, and `Done` once the
/// chunk stream is exhausted. A chunk error ends the stream.
pub fn map_openai_stream<S>(stream: S) -> EventStream
where
    S: Stream<Item = Result<CreateChatCompletionStreamResponse, OpenAIError>> + Send + Unpin + 'static,
{
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut stream = stream;
        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            for choice in chunk.choices {
                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta { text };
                    }
                }

                if let Some(finish_reason) = choice.finish_reason {
                    yield StreamEvent::MessageDelta {
                        stop_reason: map_finish_reason(finish_reason),
                    };
                }
            }
        }

        yield StreamEvent::Done;
    })
}

pub(crate) fn map_finish_reason(reason: FinishReason) -> StopReason {
    match reason {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::ContentFilter => StopReason::ContentFilter,
        FinishReason::ToolCalls | FinishReason::FunctionCall => StopReason::ToolUse,
    }
}
