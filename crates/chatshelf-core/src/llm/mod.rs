//! LLM provider abstractions for chatshelf.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: object-safe wrapper for runtime provider selection
//! - `CompletionClient`: the adapter that turns a message list into text fragments

pub mod box_provider;
pub mod client;
pub mod provider;

#[cfg(test)]
pub(crate) mod scripted;
