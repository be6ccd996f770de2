//! Lumber Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! A minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use lumber_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[logger]\nlevel = \"Debug\"").unwrap();
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [logger]
//! level = "Info"
//! full_policy = "Block"
//! time_format = "%Y-%m-%d %H:%M:%S"
//!
//! [logger.performance]
//! worker_batch_size = 2048
//! queue_capacity = 65536
//! queue_block_timeout_us = -1
//! buffer_pool_size = 65536
//! tls_buffer_count = 64
//!
//! [sink.file]
//! log_path = "logs/app.log"
//! file_buffer_size_kb = 128
//! rotate_policy = "Size"
//! rotate_size_mb = 512
//! max_rotate_files = 7
//!
//! [sink.console]
//! console_buffer_size_kb = 16
//!
//! [other]
//! reload_interval_ms = 1000
//! ```
//!
//! Only `logger.level` is hot-reloadable (see [`ConfigWatcher`]); every
//! other field is applied at init time to avoid mid-stream semantic shifts.

mod error;
mod logger;
mod sinks;
mod validation;
mod watcher;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logger::{FullPolicy, Level, LoggerConfig, PerformanceConfig};
pub use sinks::{ConsoleSinkConfig, FileSinkConfig, RotatePolicy, SinkSection};
pub use watcher::{ConfigWatcher, OtherConfig};

use serde::Deserialize;

/// Default config file path, matching the original deployment layout.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine settings (level, backpressure, performance knobs)
    pub logger: LoggerConfig,

    /// Sink settings (file, console)
    pub sink: SinkSection,

    /// Miscellaneous settings (hot-reload interval)
    pub other: OtherConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Whether the file sink is enabled (a non-empty `sink.file.log_path`)
    pub fn file_sink_enabled(&self) -> bool {
        !self.sink.file.log_path.is_empty()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
