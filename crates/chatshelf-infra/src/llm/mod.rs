//! LLM provider implementations.
//!
//! Provides a provider factory ([`create_provider`]) that builds the
//! OpenAI-compatible provider from [`ProviderSettings`], and a connection test
//! ([`test_provider_connection`]) for verifying the key and endpoint.

pub mod openai_compat;

use secrecy::SecretString;
use tracing::debug;

use chatshelf_core::llm::box_provider::BoxLlmProvider;
use chatshelf_types::config::ProviderSettings;
use chatshelf_types::llm::{CompletionRequest, LlmError, Message};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from provider settings.
///
/// An explicit `base_url` wins; otherwise the provider name picks the
/// well-known endpoint. Unknown names without a base URL are rejected.
pub fn create_provider(
    settings: &ProviderSettings,
    model: &str,
    api_key: SecretString,
) -> Result<BoxLlmProvider, LlmError> {
    let provider = match settings.base_url.as_deref() {
        Some(base_url) => OpenAiCompatibleProvider::new(OpenAiCompatConfig {
            provider_name: settings.name.clone(),
            base_url: base_url.to_string(),
            api_key,
            model: model.to_string(),
        }),
        None => match settings.name.as_str() {
            "groq" => OpenAiCompatibleProvider::groq(api_key, model),
            "openai" => OpenAiCompatibleProvider::openai(api_key, model),
            other => {
                return Err(LlmError::InvalidRequest(format!(
                    "unknown provider '{other}'; set provider.base_url for custom endpoints"
                )));
            }
        },
    };

    debug!(provider = %settings.name, model, "LLM provider created");
    Ok(BoxLlmProvider::new(provider))
}

/// Test provider connectivity by sending a minimal completion request.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(),
        messages: vec![Message::user("Hello")],
        system: None,
        max_tokens: Some(10),
        temperature: Some(0.0),
    };
    provider.complete(&request).await?;
    Ok(())
}
