//! Configuration module for flatstore.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::file::{DEFAULT_CHUNK_SIZE, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_UPLOAD_SIZE};
use crate::{FlatstoreError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Storage root. All stored files live directly in this directory.
    #[serde(default = "default_root")]
    pub root: String,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_bytes: u64,
    /// Read chunk size for downloads in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Seconds to wait for the next upload chunk before giving up on the peer.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_root() -> String {
    "files".to_string()
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT.as_secs()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            max_upload_size_bytes: default_max_upload_size(),
            chunk_size: default_chunk_size(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl FilesConfig {
    /// Storage root as a path.
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }

    /// Upload idle timeout as a Duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Static public resources.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicConfig {
    /// Document served for `GET /`.
    #[serde(default = "default_index_path")]
    pub index_path: String,
}

fn default_index_path() -> String {
    "public/index.html".to_string()
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/flatstore.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Public resources.
    #[serde(default)]
    pub public: PublicConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FlatstoreError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| FlatstoreError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FLATSTORE_FILES_ROOT`: override the storage root
    /// - `FLATSTORE_PORT`: override the listening port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("FLATSTORE_FILES_ROOT") {
            if !root.is_empty() {
                self.files.root = root;
            }
        }

        if let Ok(port) = std::env::var("FLATSTORE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid FLATSTORE_PORT value: {port}"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.files.root.is_empty() {
            return Err(FlatstoreError::Validation(
                "files.root cannot be empty".to_string(),
            ));
        }
        if self.files.max_upload_size_bytes == 0 {
            return Err(FlatstoreError::Validation(
                "files.max_upload_size_bytes must be greater than 0".to_string(),
            ));
        }
        if self.files.chunk_size == 0 {
            return Err(FlatstoreError::Validation(
                "files.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.files.idle_timeout_secs == 0 {
            return Err(FlatstoreError::Validation(
                "files.idle_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
