//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden by command-line flags.
//!
//! ```toml
//! bind = "0.0.0.0:3000"
//! state_dir = "/var/lib/vapi"
//! cache_capacity = 10000
//! recorder_retention = 1000
//! log_format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vapi_core::SandboxService;
use vapi_simulation::{FileKv, KeyValueStore, KvError, MemoryKv};

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File is not valid TOML for [`ServerConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Directory for durable state; in-memory when unset
    pub state_dir: Option<PathBuf>,
    /// Entries per store cache
    pub cache_capacity: u64,
    /// Request log entries kept per sandbox (0 = unbounded)
    pub recorder_retention: usize,
    /// Log output format
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&text)
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// With durable state directory
    #[inline]
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    /// With store cache capacity
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// With request log retention
    #[inline]
    #[must_use]
    pub fn with_recorder_retention(mut self, retention: usize) -> Self {
        self.recorder_retention = retention;
        self
    }

    /// With log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Build the sandbox service this configuration describes
    ///
    /// # Errors
    /// [`KvError`] when the state directory cannot be opened.
    pub async fn build_service(&self) -> Result<SandboxService, KvError> {
        let kv: Arc<dyn KeyValueStore> = match &self.state_dir {
            Some(dir) => Arc::new(FileKv::open(dir).await?),
            None => Arc::new(MemoryKv::new()),
        };
        Ok(SandboxService::with_kv(kv, self.cache_capacity, self.recorder_retention))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            state_dir: None,
            cache_capacity: vapi_store::DEFAULT_CAPACITY,
            recorder_retention: vapi_recorder::memory::DEFAULT_RETENTION,
            log_format: LogFormat::Pretty,
        }
    }
}
