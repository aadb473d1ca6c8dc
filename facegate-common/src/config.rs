//! Bootstrap configuration
//!
//! Settings come from two places, highest priority first:
//! 1. Command-line arguments / environment variables (applied by the binary
//!    through [`TomlConfig::apply_overrides`])
//! 2. TOML configuration file
//!
//! Anything missing falls back to the compiled defaults below. A missing
//! TOML file is not an error: the service logs a warning and starts with
//! defaults. A TOML file that exists but does not parse is a `Config` fault.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_DATABASE_PATH: &str = "facegate.db";
pub const DEFAULT_ROOM_TOKEN_LIFETIME_SECS: u64 = 3600;
/// Ten years; keeps `now + lifetime` far from chrono's range limits
pub const MAX_ROOM_TOKEN_LIFETIME_SECS: u64 = 10 * 365 * 24 * 3600;
pub const DEFAULT_RECOGNITION_WORKERS: usize = 2;
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
pub const DEFAULT_TOLERANCE: f32 = 0.6;
pub const DEFAULT_DESCRIPTOR_LEN: usize = 128;

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Lifetime of a room temp token issued by room login
    #[serde(default = "default_room_token_lifetime_secs")]
    pub room_token_lifetime_secs: u64,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Recognition worker pool and matching settings
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    /// Number of worker threads for CPU-bound recognition
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Jobs that may wait for a worker before submitters are held back
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum euclidean distance for a face to count as known
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Length of a face descriptor vector
    #[serde(default = "default_descriptor_len")]
    pub descriptor_len: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_room_token_lifetime_secs() -> u64 {
    DEFAULT_ROOM_TOKEN_LIFETIME_SECS
}

fn default_workers() -> usize {
    DEFAULT_RECOGNITION_WORKERS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_tolerance() -> f32 {
    DEFAULT_TOLERANCE
}

fn default_descriptor_len() -> usize {
    DEFAULT_DESCRIPTOR_LEN
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            tolerance: default_tolerance(),
            descriptor_len: default_descriptor_len(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_address: default_bind_address(),
            port: default_port(),
            room_token_lifetime_secs: default_room_token_lifetime_secs(),
            recognition: RecognitionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line / environment overrides
    pub fn apply_overrides(
        &mut self,
        database_path: Option<PathBuf>,
        bind_address: Option<String>,
        port: Option<u16>,
    ) {
        if let Some(path) = database_path {
            self.database_path = path;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        if let Some(port) = port {
            self.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.room_token_lifetime_secs == 0 {
            return Err(Error::Config(
                "room_token_lifetime_secs must be greater than 0".to_string(),
            ));
        }
        if self.room_token_lifetime_secs > MAX_ROOM_TOKEN_LIFETIME_SECS {
            return Err(Error::Config(format!(
                "room_token_lifetime_secs must be at most {}",
                MAX_ROOM_TOKEN_LIFETIME_SECS
            )));
        }
        if self.recognition.workers == 0 {
            return Err(Error::Config(
                "recognition.workers must be at least 1".to_string(),
            ));
        }
        if self.recognition.queue_capacity == 0 {
            return Err(Error::Config(
                "recognition.queue_capacity must be at least 1".to_string(),
            ));
        }
        if !(self.recognition.tolerance > 0.0) {
            return Err(Error::Config(
                "recognition.tolerance must be greater than 0".to_string(),
            ));
        }
        if self.recognition.descriptor_len == 0 {
            return Err(Error::Config(
                "recognition.descriptor_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
