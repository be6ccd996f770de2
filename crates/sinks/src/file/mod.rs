//! File sink - append-mode log file with rotation and retention
//!
//! Owns an explicit write buffer (`BufWriter` sized by
//! `file_buffer_size_kb`) over an append-mode file and tracks the active
//! file's size, seeded from `stat` at open. Before every write the
//! rotation policy is consulted; when it fires:
//!
//! 1. flush and sync the active file, then close it
//! 2. rename it to the rotated name (`<base><date>` or `<base>_<N>`)
//! 3. reopen the base path fresh
//! 4. trim the retention queue down to `max_rotate_files`
//!
//! Failures are contained: a failed open suppresses writes until the next
//! `apply_config`; a failed rename keeps the active file open with its
//! data intact. Rotation runs only on the worker thread - the mutex here
//! exists for the rare `apply_config` call arriving from elsewhere.

pub(crate) mod rotation;

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use lumber_config::{Config, RotatePolicy};
use lumber_core::{Record, RecordFormatter, Sink};
use parking_lot::Mutex;

use crate::common::{CountersSnapshot, SinkCounters, SinkError};
use rotation::RotationState;

/// Construction options for [`FileSink`]
#[derive(Debug, Clone)]
pub struct FileSinkOptions {
    /// Active log file path
    pub path: PathBuf,

    /// Internal write buffer size in bytes
    pub buffer_size: usize,

    /// strftime pattern for the header timestamp
    pub time_format: String,

    /// Rotation policy
    pub rotate_policy: RotatePolicy,

    /// Size threshold in bytes for the Size policy
    pub rotate_size_bytes: u64,

    /// Rotated files to retain
    pub max_rotate_files: usize,
}

impl FileSinkOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer_size: 128 * 1024,
            time_format: "%Y-%m-%d %H:%M:%S".into(),
            rotate_policy: RotatePolicy::None,
            rotate_size_bytes: 1024 * 1024 * 1024,
            max_rotate_files: 7,
        }
    }

    /// Derive options from the `[sink.file]` and `[logger]` sections
    pub fn from_config(config: &Config) -> Self {
        let file = &config.sink.file;
        Self {
            path: PathBuf::from(&file.log_path),
            buffer_size: file.file_buffer_size(),
            time_format: config.logger.time_format.clone(),
            rotate_policy: file.rotate_policy,
            rotate_size_bytes: file.rotate_size_bytes(),
            max_rotate_files: file.max_rotate_files,
        }
    }

    #[must_use]
    pub fn with_rotate_policy(mut self, policy: RotatePolicy) -> Self {
        self.rotate_policy = policy;
        self
    }

    #[must_use]
    pub fn with_rotate_size_bytes(mut self, bytes: u64) -> Self {
        self.rotate_size_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_max_rotate_files(mut self, count: usize) -> Self {
        self.max_rotate_files = count;
        self
    }

    #[must_use]
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }
}

struct FileState {
    base_path: PathBuf,
    /// `None` after a failed open; writes are suppressed until
    /// `apply_config` reopens it
    file: Option<BufWriter<File>>,
    buffer_size: usize,
    current_size: u64,
    formatter: RecordFormatter,
    line: Vec<u8>,
    rotation: RotationState,
}

impl FileState {
    fn open_file(path: &Path, buffer_size: usize) -> std::io::Result<(BufWriter<File>, u64)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok((BufWriter::with_capacity(buffer_size.max(1), file), size))
    }

    fn reopen(&mut self) {
        match Self::open_file(&self.base_path, self.buffer_size) {
            Ok((file, size)) => {
                self.file = Some(file);
                self.current_size = size;
            }
            Err(e) => {
                tracing::error!(
                    path = %self.base_path.display(),
                    error = %e,
                    "failed to open log file; writes suppressed"
                );
                self.file = None;
            }
        }
    }

    /// Flush and fsync the active file in place
    fn sync_file(&mut self) -> std::io::Result<()> {
        if let Some(writer) = self.file.as_mut() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn write_record(&mut self, record: &Record, counters: &SinkCounters) {
        if self.file.is_none() {
            return;
        }

        if self
            .rotation
            .needs_rotation(self.current_size, record.timestamp_ns)
        {
            self.rotate(record.timestamp_ns, counters);
        }

        let Some(writer) = self.file.as_mut() else {
            return;
        };

        self.line.clear();
        self.formatter.format_record(record, &mut self.line);
        match writer.write_all(&self.line) {
            Ok(()) => {
                self.current_size += self.line.len() as u64;
                counters.record_written(self.line.len() as u64);
            }
            Err(e) => {
                counters.record_error();
                tracing::error!(
                    path = %self.base_path.display(),
                    error = %e,
                    "log file write failed"
                );
            }
        }
    }

    /// Rotate the active file aside and start a fresh one
    fn rotate(&mut self, ts_ns: i64, counters: &SinkCounters) {
        if self.file.is_none() {
            return;
        }

        if let Err(e) = self.sync_file() {
            tracing::warn!(
                path = %self.base_path.display(),
                error = %e,
                "flush before rotation failed"
            );
        }
        self.file = None;

        let rotated = self.rotation.rotated_name(&self.base_path);
        if let Err(e) = fs::rename(&self.base_path, &rotated) {
            tracing::error!(
                from = %self.base_path.display(),
                to = %rotated.display(),
                error = %e,
                "rotation rename failed; keeping active file"
            );
            counters.record_error();
            // The data is still in the base file; reopen and carry on.
            self.reopen();
            return;
        }

        self.reopen();
        self.current_size = 0;
        self.rotation.advance(ts_ns);
        counters.record_rotation();
        tracing::info!(
            path = %self.base_path.display(),
            rotated = %rotated.display(),
            "log file rotated"
        );

        for evicted in self.rotation.retain(rotated) {
            if let Err(e) = fs::remove_file(&evicted) {
                tracing::warn!(
                    path = %evicted.display(),
                    error = %e,
                    "failed to remove expired log file"
                );
            }
        }
    }
}

/// File sink with rotation and retention
pub struct FileSink {
    state: Mutex<FileState>,
    counters: Arc<SinkCounters>,
}

impl FileSink {
    /// Open the active log file (creating parent directories) and build
    /// the sink.
    ///
    /// # Errors
    ///
    /// Fails when the base path cannot be opened for append.
    pub fn open(options: FileSinkOptions) -> Result<Self, SinkError> {
        if options.path.as_os_str().is_empty() {
            return Err(SinkError::config("file sink requires a non-empty path"));
        }

        let (file, size) = FileState::open_file(&options.path, options.buffer_size)?;
        let state = FileState {
            base_path: options.path,
            file: Some(file),
            buffer_size: options.buffer_size,
            current_size: size,
            formatter: RecordFormatter::new(options.time_format),
            line: Vec::with_capacity(256),
            rotation: RotationState::new(
                options.rotate_policy,
                options.rotate_size_bytes,
                options.max_rotate_files,
            ),
        };

        Ok(Self {
            state: Mutex::new(state),
            counters: Arc::new(SinkCounters::new()),
        })
    }

    /// Trigger a rotation outside the policy schedule
    pub fn force_rotate(&self) {
        let now_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        let mut state = self.state.lock();
        state.rotate(now_ns, &self.counters);
    }

    /// Size of the active file as tracked by the sink
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    /// Counters handle that outlives the sink registration
    pub fn counters(&self) -> Arc<SinkCounters> {
        Arc::clone(&self.counters)
    }
}

impl Sink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn log(&self, record: &Record) {
        let mut state = self.state.lock();
        state.write_record(record, &self.counters);
    }

    fn log_batch(&self, records: &[Record]) {
        let mut state = self.state.lock();
        for record in records {
            state.write_record(record, &self.counters);
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        if let Some(writer) = state.file.as_mut() {
            if let Err(e) = writer.flush() {
                self.counters.record_error();
                tracing::error!(error = %e, "log file flush failed");
            }
        }
        self.counters.record_flush();
    }

    fn sync(&self) {
        let mut state = self.state.lock();
        if let Err(e) = state.sync_file() {
            self.counters.record_error();
            tracing::error!(error = %e, "log file sync failed");
        }
    }

    fn apply_config(&self, config: &Config) {
        let file_config = &config.sink.file;
        let mut state = self.state.lock();

        state.rotation.set_policy(
            file_config.rotate_policy,
            file_config.rotate_size_bytes(),
            file_config.max_rotate_files,
        );
        state.formatter.set_time_format(&config.logger.time_format);

        let new_buffer_size = file_config.file_buffer_size().max(1);
        if new_buffer_size != state.buffer_size {
            state.buffer_size = new_buffer_size;
            // Swap the writer to pick up the new buffer capacity.
            if let Some(writer) = state.file.take() {
                match writer.into_inner() {
                    Ok(file) => {
                        state.file = Some(BufWriter::with_capacity(new_buffer_size, file));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to resize file buffer");
                        state.reopen();
                    }
                }
            }
        }

        // A sink whose open failed earlier gets another chance here.
        if state.file.is_none() {
            state.reopen();
        }
    }
}
