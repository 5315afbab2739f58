//! Global configuration loader for chatshelf.
//!
//! Reads `config.toml` from the data directory (`~/.chatshelf/` in
//! production) and deserializes it into [`GlobalConfig`]. Falls back to the
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use chatshelf_types::config::{GlobalConfig, ProviderSettings};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CHATSHELF_DATA_DIR";

/// Lower bound for the per-fragment wait.
const MIN_REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key not found: set the {var} environment variable")]
    MissingApiKey { var: String },
}

/// Resolve the data directory.
///
/// Uses `CHATSHELF_DATA_DIR` if set, otherwise `~/.chatshelf`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok())
}

fn data_dir_from(env_value: Option<String>) -> PathBuf {
    if let Some(dir) = env_value.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".chatshelf");
    }

    PathBuf::from(".chatshelf")
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`GlobalConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Per-fragment wait, with a floor of five seconds.
pub fn resolve_request_timeout(config: &GlobalConfig) -> Duration {
    Duration::from_secs(config.request_timeout_secs.max(MIN_REQUEST_TIMEOUT_SECS))
}

/// Read the provider's API key from the environment variable it names.
pub fn resolve_api_key(settings: &ProviderSettings) -> Result<SecretString, ConfigError> {
    api_key_from(settings, |var| std::env::var(var).ok())
}

fn api_key_from(
    settings: &ProviderSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    match lookup(&settings.api_key_env) {
        Some(key) if !key.trim().is_empty() => Ok(SecretString::from(key.trim().to_string())),
        _ => Err(ConfigError::MissingApiKey {
            var: settings.api_key_env.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
model = "llama-3.1-8b-instant"
request_timeout_secs = 30

[provider]
name = "openai"
api_key_env = "OPENAI_API_KEY"
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.provider.name, "openai");
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn resolve_request_timeout_enforces_floor() {
        let mut config = GlobalConfig::default();
        assert_eq!(resolve_request_timeout(&config), Duration::from_secs(120));
        config.request_timeout_secs = 1;
        assert_eq!(resolve_request_timeout(&config), Duration::from_secs(5));
    }

    #[test]
    fn data_dir_prefers_env_value() {
        assert_eq!(
            data_dir_from(Some("/srv/shelf".to_string())),
            PathBuf::from("/srv/shelf")
        );
        assert!(data_dir_from(None).ends_with(".chatshelf"));
        assert!(data_dir_from(Some(String::new())).ends_with(".chatshelf"));
    }

    #[test]
    fn api_key_read_from_named_variable() {
        let settings = ProviderSettings::default();
        let key = api_key_from(&settings, |var| {
            (var == "GROQ_API_KEY").then(|| " gsk-abc \n".to_string())
        })
        .unwrap();
        assert_eq!(key.expose_secret(), "gsk-abc");
    }

    #[test]
    fn api_key_missing_names_the_variable() {
        let settings = ProviderSettings::default();
        let err = api_key_from(&settings, |_| None).unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
        assert!(api_key_from(&settings, |_| Some("  ".to_string())).is_err());
    }
}
