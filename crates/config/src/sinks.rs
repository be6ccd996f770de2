//! Sink configuration: file sink (rotation, retention) and console sink.

use serde::Deserialize;

/// File rotation policy
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum RotatePolicy {
    /// Never rotate
    #[default]
    #[serde(alias = "none", alias = "NONE")]
    None,
    /// Rotate at local midnight; rotated file is named `<log_path><YYYY-MM-DD>`
    #[serde(alias = "daily", alias = "DAILY")]
    Daily,
    /// Rotate when the file reaches `rotate_size_mb`; rotated file is named
    /// `<log_path>_<N>` with the smallest unused N
    #[serde(alias = "size", alias = "SIZE")]
    Size,
}

impl RotatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Daily => "Daily",
            Self::Size => "Size",
        }
    }
}

/// `[sink]` section grouping the per-sink tables
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    pub file: FileSinkConfig,
    pub console: ConsoleSinkConfig,
}

/// File sink configuration
///
/// # Example
///
/// ```toml
/// [sink.file]
/// log_path = "logs/app.log"
/// file_buffer_size_kb = 128
/// rotate_policy = "Size"
/// rotate_size_mb = 512
/// max_rotate_files = 7
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    /// Active log file path; an empty string disables the file sink
    pub log_path: String,

    /// Internal write buffer size in KiB
    /// Default: 128
    pub file_buffer_size_kb: usize,

    /// Rotation policy (None, Daily, Size)
    pub rotate_policy: RotatePolicy,

    /// Size threshold in MiB for the Size policy
    /// Default: 1024
    pub rotate_size_mb: usize,

    /// Rotated files to retain; 0 deletes every rotated file immediately
    /// Default: 7
    pub max_rotate_files: usize,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            log_path: String::new(),
            file_buffer_size_kb: 128,
            rotate_policy: RotatePolicy::None,
            rotate_size_mb: 1024,
            max_rotate_files: 7,
        }
    }
}

impl FileSinkConfig {
    /// Write buffer size in bytes
    pub fn file_buffer_size(&self) -> usize {
        self.file_buffer_size_kb * 1024
    }

    /// Size-rotation threshold in bytes
    pub fn rotate_size_bytes(&self) -> u64 {
        self.rotate_size_mb as u64 * 1024 * 1024
    }

    #[must_use]
    pub fn with_log_path(mut self, path: impl Into<String>) -> Self {
        self.log_path = path.into();
        self
    }

    #[must_use]
    pub fn with_rotate_policy(mut self, policy: RotatePolicy) -> Self {
        self.rotate_policy = policy;
        self
    }

    #[must_use]
    pub fn with_rotate_size_mb(mut self, size_mb: usize) -> Self {
        self.rotate_size_mb = size_mb;
        self
    }

    #[must_use]
    pub fn with_max_rotate_files(mut self, count: usize) -> Self {
        self.max_rotate_files = count;
        self
    }
}

/// Console sink configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleSinkConfig {
    /// Scratch buffer size in KiB
    /// Default: 1
    pub console_buffer_size_kb: usize,
}

impl Default for ConsoleSinkConfig {
    fn default() -> Self {
        Self {
            console_buffer_size_kb: 1,
        }
    }
}

impl ConsoleSinkConfig {
    /// Scratch buffer size in bytes
    pub fn console_buffer_size(&self) -> usize {
        self.console_buffer_size_kb * 1024
    }
}
