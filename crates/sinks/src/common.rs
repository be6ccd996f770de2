//! Common types and utilities for sinks

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Per-sink counters
///
/// Updated on the worker's hot path with relaxed atomics; read via
/// [`SinkCounters::snapshot`].
#[derive(Debug, Default)]
pub struct SinkCounters {
    /// Records formatted and handed to the destination
    pub records_written: AtomicU64,

    /// Bytes produced by the formatter
    pub bytes_written: AtomicU64,

    /// Write or send failures absorbed
    pub write_errors: AtomicU64,

    /// Flush operations performed
    pub flush_count: AtomicU64,

    /// File rotations completed (file sink only)
    pub rotations: AtomicU64,
}

impl SinkCounters {
    pub const fn new() -> Self {
        Self {
            records_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_written(&self, bytes: u64) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_flush(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of the counters
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            records_written: self.records_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub records_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
    pub flush_count: u64,
    pub rotations: u64,
}

/// Common sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink initialization failed
    #[error("failed to initialize sink: {0}")]
    Init(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (HTTP sink)
    #[error("send failed: {0}")]
    Send(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl SinkError {
    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Create a send error
    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
