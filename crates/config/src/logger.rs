//! Engine configuration: level, backpressure policy, performance knobs.

use serde::Deserialize;

/// Severity threshold for the engine.
///
/// Records below the configured level are rejected before any buffer is
/// acquired. This is the only hot-reloadable setting.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    #[serde(alias = "debug", alias = "DEBUG")]
    Debug,
    #[default]
    #[serde(alias = "info", alias = "INFO")]
    Info,
    #[serde(alias = "warn", alias = "WARN")]
    Warn,
    #[serde(alias = "error", alias = "ERROR")]
    Error,
    #[serde(alias = "fatal", alias = "FATAL")]
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Info => "Info",
            Self::Warn => "Warn",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }
}

/// What to do when the record queue is full.
///
/// Load-time only; switching policies mid-stream would make drop accounting
/// meaningless.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum FullPolicy {
    /// Spin, then sleep, retrying until `queue_block_timeout_us` elapses.
    #[default]
    #[serde(alias = "block", alias = "BLOCK")]
    Block,
    /// Fail the push immediately; the caller counts the drop.
    #[serde(alias = "drop", alias = "DROP")]
    Drop,
}

/// Engine configuration
///
/// # Example
///
/// ```toml
/// [logger]
/// level = "Info"
/// full_policy = "Block"
/// time_format = "%Y-%m-%d %H:%M:%S"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Minimum severity to accept (hot-reloadable)
    pub level: Level,

    /// Queue-full policy (load-time only)
    pub full_policy: FullPolicy,

    /// strftime pattern for the record header timestamp.
    /// Rejected at validation time if it renders to nothing.
    pub time_format: String,

    /// Performance knobs
    pub performance: PerformanceConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            full_policy: FullPolicy::Block,
            time_format: "%Y-%m-%d %H:%M:%S".into(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_full_policy(mut self, policy: FullPolicy) -> Self {
        self.full_policy = policy;
        self
    }

    #[must_use]
    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }
}

/// Performance knobs for the queue, worker, and buffer pool
///
/// # Example
///
/// ```toml
/// [logger.performance]
/// worker_batch_size = 2048
/// queue_capacity = 65536
/// queue_block_timeout_us = -1
/// buffer_pool_size = 65536
/// tls_buffer_count = 64
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Records drained per worker iteration
    /// Default: 2048
    pub worker_batch_size: usize,

    /// Queue capacity; 0 means effectively unbounded (no push ever rejected)
    /// Default: 65536
    pub queue_capacity: usize,

    /// Block-policy timeout in microseconds; negative means wait forever
    /// Default: -1
    pub queue_block_timeout_us: i64,

    /// Buffers pre-allocated into the global pool
    /// Default: 65536
    pub buffer_pool_size: usize,

    /// Buffers cached per producer thread
    /// Default: 64
    pub tls_buffer_count: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            worker_batch_size: 2048,
            queue_capacity: 65536,
            queue_block_timeout_us: -1,
            buffer_pool_size: 65536,
            tls_buffer_count: 64,
        }
    }
}

impl PerformanceConfig {
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_worker_batch_size(mut self, size: usize) -> Self {
        self.worker_batch_size = size;
        self
    }

    #[must_use]
    pub fn with_block_timeout_us(mut self, timeout_us: i64) -> Self {
        self.queue_block_timeout_us = timeout_us;
        self
    }

    #[must_use]
    pub fn with_buffer_pool_size(mut self, size: usize) -> Self {
        self.buffer_pool_size = size;
        self
    }

    #[must_use]
    pub fn with_tls_buffer_count(mut self, count: usize) -> Self {
        self.tls_buffer_count = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.full_policy, FullPolicy::Block);
        assert_eq!(config.time_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(config.performance.worker_batch_size, 2048);
        assert_eq!(config.performance.queue_capacity, 65536);
        assert_eq!(config.performance.queue_block_timeout_us, -1);
        assert_eq!(config.performance.buffer_pool_size, 65536);
        assert_eq!(config.performance.tls_buffer_count, 64);
    }

    #[test]
    fn test_deserialize_all_levels() {
        for (s, expected) in [
            ("Debug", Level::Debug),
            ("Info", Level::Info),
            ("Warn", Level::Warn),
            ("Error", Level::Error),
            ("Fatal", Level::Fatal),
        ] {
            let toml = format!("level = \"{}\"", s);
            let config: LoggerConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config.level, expected);
        }
    }

    #[test]
    fn test_deserialize_level_aliases() {
        let config: LoggerConfig = toml::from_str("level = \"DEBUG\"").unwrap();
        assert_eq!(config.level, Level::Debug);
        let config: LoggerConfig = toml::from_str("level = \"warn\"").unwrap();
        assert_eq!(config.level, Level::Warn);
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_deserialize_policies() {
        let config: LoggerConfig = toml::from_str("full_policy = \"Drop\"").unwrap();
        assert_eq!(config.full_policy, FullPolicy::Drop);
        let config: LoggerConfig = toml::from_str("full_policy = \"Block\"").unwrap();
        assert_eq!(config.full_policy, FullPolicy::Block);
    }

    #[test]
    fn test_builder_chain() {
        let config = LoggerConfig::default()
            .with_level(Level::Error)
            .with_full_policy(FullPolicy::Drop)
            .with_time_format("%H:%M:%S");
        assert_eq!(config.level, Level::Error);
        assert_eq!(config.full_policy, FullPolicy::Drop);
        assert_eq!(config.time_format, "%H:%M:%S");
    }

    #[test]
    fn test_negative_timeout_accepted() {
        let config: PerformanceConfig =
            toml::from_str("queue_block_timeout_us = -5").unwrap();
        assert!(config.queue_block_timeout_us < 0);
    }
}
