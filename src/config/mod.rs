//! Configuration loading: optional TOML file with environment overrides.
//!
//! The upstream API key is deliberately env-only (`CHARRELAY_API_KEY`) so it
//! never lands in a config file checked into a repo. Startup fails fast when
//! it is missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "CHARRELAY_API_KEY";
pub const API_URL_ENV: &str = "CHARRELAY_API_URL";
pub const MODEL_ENV: &str = "CHARRELAY_MODEL";
pub const COOKIE_SECRET_ENV: &str = "CHARRELAY_COOKIE_SECRET";
pub const CONFIG_PATH_ENV: &str = "CHARRELAY_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "charrelay.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    /// Character name -> system prompt. When present in the config file this
    /// table replaces the built-in characters entirely.
    #[serde(default)]
    pub characters: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible API. A URL already ending in
    /// `/chat/completions` is used as-is.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Resolved from the environment, never read from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Secret the session cookie signing key is derived from. When unset a
    /// fresh key is generated at startup, which invalidates existing cookies
    /// on restart — harmless, since transcripts are in-memory anyway.
    #[serde(default)]
    pub cookie_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfig {
    /// Upper bound on entries kept per transcript. Unset means unbounded,
    /// matching the historical behavior; the store evicts the oldest
    /// non-system entries when the cap is hit.
    #[serde(default)]
    pub max_transcript_entries: Option<usize>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_model() -> String {
    "grok-beta".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load config from `$CHARRELAY_CONFIG` (or `./charrelay.toml` if present),
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match config_file_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(API_URL_ENV) {
            self.upstream.base_url = url;
        }
        if let Some(model) = non_empty_env(MODEL_ENV) {
            self.upstream.model = model;
        }
        if let Some(secret) = non_empty_env(COOKIE_SECRET_ENV) {
            self.session.cookie_secret = Some(secret);
        }
        self.upstream.api_key = non_empty_env(API_KEY_ENV);
    }

    /// Fail fast when the upstream credential is absent.
    pub fn require_api_key(&self) -> Result<&str> {
        self.upstream
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("upstream API key not set; export {API_KEY_ENV}"))
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = non_empty_env(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.upstream.model, "grok-beta");
        assert!(config.upstream.api_key.is_none());
        assert!(config.relay.max_transcript_entries.is_none());
    }

    #[test]
    fn parses_full_file() {
        let raw = r#"
            [gateway]
            host = "0.0.0.0"
            port = 8080

            [upstream]
            base_url = "https://api.example.com/v1"
            model = "test-model"

            [relay]
            max_transcript_entries = 40

            [characters]
            oracle = "You speak in riddles."
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.upstream.base_url, "https://api.example.com/v1");
        assert_eq!(config.relay.max_transcript_entries, Some(40));
        let characters = config.characters.unwrap();
        assert_eq!(characters["oracle"], "You speak in riddles.");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str("[gateway]\nport = 9000\n").unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.upstream.base_url, "https://api.x.ai/v1");
    }

    #[test]
    fn api_key_never_deserializes_from_file() {
        let config: Config = toml::from_str("[upstream]\nmodel = \"m\"\n").unwrap();
        assert!(config.upstream.api_key.is_none());
    }

    #[test]
    fn require_api_key_errors_when_missing() {
        let config = Config::default();
        let err = config.require_api_key().unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn require_api_key_returns_key() {
        let mut config = Config::default();
        config.upstream.api_key = Some("test-credential".to_string());
        assert_eq!(config.require_api_key().unwrap(), "test-credential");
    }
}
