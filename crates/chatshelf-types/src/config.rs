//! Global configuration types for chatshelf.
//!
//! `GlobalConfig` represents the top-level `config.toml` that selects the
//! model, the provider endpoint and request limits.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.chatshelf/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Model identifier sent with every completion request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional system prompt prepended to every request (never stored).
    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub temperature: Option<f64>,

    /// Maximum wait for the next streamed fragment, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub provider: ProviderSettings,
}

fn default_model() -> String {
    "llama-3.2-3b-preview".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            request_timeout_secs: default_request_timeout_secs(),
            provider: ProviderSettings::default(),
        }
    }
}

/// Which OpenAI-compatible endpoint to talk to and where its key lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Well-known provider name ("groq", "openai") or a custom label.
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Override the provider's default base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_provider_name() -> String {
    "groq".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}
