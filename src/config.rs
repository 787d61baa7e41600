//! Client configuration.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (PROVIT_API_KEY, PROVIT_API_URL, ...)
//! 2. Config file (YAML), when loaded with [`ClientConfig::from_yaml_file`]
//! 3. Defaults
//!
//! Every client owns its configuration. There is no process-wide config,
//! so independent clients can point at different endpoints.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::dispatch::DEFAULT_QUEUE_CAPACITY;

/// Production ingestion endpoint
pub const DEFAULT_API_URL: &str = "https://api.provit.ai";

/// Path appended to `api_url`
pub const EVENTS_PATH: &str = "/v1/events";

pub const ENV_API_KEY: &str = "PROVIT_API_KEY";
pub const ENV_API_URL: &str = "PROVIT_API_URL";
pub const ENV_DEBUG: &str = "PROVIT_DEBUG";
pub const ENV_NORMALIZE_LABELS: &str = "PROVIT_NORMALIZE_LABELS";
pub const ENV_QUEUE_CAPACITY: &str = "PROVIT_QUEUE_CAPACITY";
pub const ENV_TIMEOUT_MS: &str = "PROVIT_TIMEOUT_MS";

/// Invalid configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("api_key is required")]
    MissingApiKey,

    #[error("api_url must start with http:// or https://: {0}")]
    InvalidApiUrl(String),

    #[error("queue_capacity must be at least 1")]
    ZeroCapacity,

    #[error("timeout_ms must be at least 1")]
    ZeroTimeout,

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Options recognized by the client
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// Bearer credential sent with every delivery
    #[serde(default)]
    pub api_key: String,

    /// Ingestion base URL (default: production)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Emit diagnostics to the debug channel (default: false)
    #[serde(default)]
    pub debug: bool,

    /// Trim and lowercase labels (default: true)
    #[serde(default = "default_normalize_labels")]
    pub normalize_labels: bool,

    /// Dispatch queue bound (default: 1000)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-delivery timeout in milliseconds (default: 2000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_normalize_labels() -> bool {
    true
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_timeout_ms() -> u64 {
    2000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_api_url(),
            debug: false,
            normalize_labels: default_normalize_labels(),
            queue_capacity: default_queue_capacity(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

// Keep the credential out of logs
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("debug", &self.debug)
            .field("normalize_labels", &self.normalize_labels)
            .field("queue_capacity", &self.queue_capacity)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl ClientConfig {
    /// Defaults plus the required API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_normalize_labels(mut self, normalize: bool) -> Self {
        self.normalize_labels = normalize;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Per-delivery timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Full URL records are POSTed to
    pub fn events_endpoint(&self) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), EVENTS_PATH)
    }

    /// Check invariants the client relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Load a YAML file, then apply environment overrides.
    ///
    /// ```yaml
    /// api_key: sk-live-...
    /// api_url: https://api.provit.ai
    /// debug: false
    /// queue_capacity: 5000
    /// ```
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        Self::load_yaml(path, |var| std::env::var(var).ok())
    }

    /// File layer, then overrides from `lookup`
    fn load_yaml<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .apply_env(lookup)
            .with_context(|| format!("Invalid override for config file: {}", path.display()))?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the environment, in practice)
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug = parse_bool(ENV_DEBUG, &value)?;
        }
        if let Some(value) = lookup(ENV_NORMALIZE_LABELS) {
            self.normalize_labels = parse_bool(ENV_NORMALIZE_LABELS, &value)?;
        }
        if let Some(value) = lookup(ENV_QUEUE_CAPACITY) {
            self.queue_capacity = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_QUEUE_CAPACITY,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_TIMEOUT_MS,
                value: value.clone(),
            })?;
        }
        Ok(())
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
        }),
    }
}
