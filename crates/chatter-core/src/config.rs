//! User configuration
//!
//! Resolved in layers: built-in defaults, then `~/.chatter/config.toml` (or an
//! explicit file), then `CHATTER_*` environment variables. The CLI applies its
//! own flags on top.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::ai::types::RequestOptions;
use crate::constants;
use crate::paths;

/// Environment variable overriding the endpoint URL
pub const ENV_ENDPOINT: &str = "CHATTER_ENDPOINT";
/// Environment variable overriding the model ID
pub const ENV_MODEL: &str = "CHATTER_MODEL";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Full chat/completions URL
    pub endpoint: String,
    /// Model ID sent with every request
    pub model: String,
    pub temperature: f32,
    /// Maximum reply tokens, `-1` for unbounded
    pub max_tokens: i64,
    pub connect_timeout_secs: u64,
    pub stream_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::ai::DEFAULT_ENDPOINT.to_string(),
            model: constants::ai::DEFAULT_MODEL.to_string(),
            temperature: constants::ai::DEFAULT_TEMPERATURE,
            max_tokens: constants::ai::UNBOUNDED_MAX_TOKENS,
            connect_timeout_secs: constants::http::CONNECT_TIMEOUT.as_secs(),
            stream_timeout_secs: constants::http::STREAM_TIMEOUT.as_secs(),
        }
    }
}

impl ChatConfig {
    /// Load configuration
    ///
    /// With `path = None` the default file is read if it exists. An explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = paths::config_file();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `CHATTER_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            debug!("Endpoint overridden by {}", ENV_ENDPOINT);
            self.endpoint = endpoint;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            debug!("Model overridden by {}", ENV_MODEL);
            self.model = model;
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    /// Sampling settings stamped into every request
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.endpoint, "http://localhost:1234/v1/chat/completions");
        assert_eq!(config.max_tokens, -1);
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.stream_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "model = \"llama-3\"\ntemperature = 0.2\n").unwrap();

        let config = ChatConfig::from_file(&path).expect("Failed to load config");
        assert_eq!(config.model, "llama-3");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.endpoint, ChatConfig::default().endpoint);
        assert_eq!(config.max_tokens, -1);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let missing = temp.path().join("nope.toml");
        assert!(ChatConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "max_tokens = \"lots\"").unwrap();
        assert!(ChatConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_ENDPOINT, "http://10.0.0.2:8080/v1/chat/completions"),
            (ENV_MODEL, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = ChatConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.endpoint, "http://10.0.0.2:8080/v1/chat/completions");
        assert_eq!(config.model, ChatConfig::default().model, "blank value ignored");
    }

    #[test]
    fn test_request_options_mirror_config() {
        let config = ChatConfig {
            model: "mistral".to_string(),
            temperature: 1.1,
            max_tokens: 512,
            ..Default::default()
        };
        let options = config.request_options();
        assert_eq!(options.model, "mistral");
        assert_eq!(options.max_tokens, 512);
        assert!((options.temperature - 1.1).abs() < f32::EPSILON);
    }
}
