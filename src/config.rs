//! Runtime configuration for chat-gateway.
//!
//! Configuration is loaded from a JSON file, falling back to defaults for any
//! missing section or field. The provider credential never lives in the file;
//! it comes from the command line or the `ANTHROPIC_API_KEY` environment
//! variable and is read once at startup.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-gateway", about = "Streams chat completions to browsers as Server-Sent Events")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Upstream provider API key.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Upstream provider settings.
    pub provider: ProviderConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,

    /// Directory of built UI assets served for non-API paths.
    pub static_dir: Option<PathBuf>,

    /// Events buffered between the upstream task and the response writer.
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            static_dir: None,
            event_buffer: 32,
        }
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL, without the `/v1/messages` path.
    pub base_url: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Upper bound on generated tokens per request.
    pub max_tokens: u32,

    /// Value of the `anthropic-version` header.
    pub anthropic_version: String,

    /// TCP/TLS connect timeout. Streams themselves have no deadline.
    pub connect_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 1054,
            anthropic_version: "2023-06-01".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.max_tokens == 0 {
            return Err(ConfigError::Invalid("provider.max_tokens must be positive".into()));
        }
        if self.server.event_buffer == 0 {
            return Err(ConfigError::Invalid("server.event_buffer must be positive".into()));
        }
        if self.provider.model.is_empty() {
            return Err(ConfigError::Invalid("provider.model must not be empty".into()));
        }
        Ok(())
    }
}
