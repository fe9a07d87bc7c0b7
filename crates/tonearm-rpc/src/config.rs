//! Client configuration.
//!
//! Values are resolved in order: built-in defaults, then
//! `<config dir>/tonearm/config.json`, then the `MPD_HOST` / `MPD_PORT`
//! environment variables. Callers may override the result further (the CLI
//! applies its `--host` / `--port` flags last).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::protocol::{DEFAULT_HOST, DEFAULT_PORT};
use crate::transport::DEFAULT_MAX_LINE_LENGTH;

const CONFIG_FILE_NAME: &str = "config.json";

const KNOWN_FIELDS: [&str; 5] = [
    "host",
    "port",
    "connectTimeoutMs",
    "readTimeoutMs",
    "maxLineLength",
];

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Connection settings for the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Applies to each response line, not the whole response
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_read_timeout() -> u64 {
    30_000
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
            max_line_length: default_max_line_length(),
        }
    }
}

impl ClientConfig {
    /// Default config file location, if the platform has a config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tonearm").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load config from file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        warn_unknown_fields(&content, path);
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from the default location and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or an environment
    /// override is malformed.
    pub fn discover() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply `MPD_HOST` and `MPD_PORT` using the given lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` if `MPD_PORT` is not a valid port.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MPD_HOST").filter(|h| !h.is_empty()) {
            self.host = host;
        }

        if let Some(port) = lookup("MPD_PORT").filter(|p| !p.is_empty()) {
            self.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "MPD_PORT",
                value: port.clone(),
            })?;
        }

        Ok(())
    }

    /// `host:port` as passed to the socket connect
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn warn_unknown_fields(content: &str, path: &Path) {
    let Ok(serde_json::Value::Object(obj)) = serde_json::from_str::<serde_json::Value>(content)
    else {
        return;
    };

    for key in obj.keys() {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            warn!("Unknown config field in {}: {key}", path.display());
        }
    }
}
