//! Lumber - Sinks
//!
//! Output adapters for the engine's worker. Each sink implements the
//! [`lumber_core::Sink`] capability set - `log`, `log_batch`, `flush`,
//! `sync`, `apply_config` - formats records into its own scratch buffer,
//! and absorbs its own I/O failures (one diagnostic line, a counter bump,
//! and the pipeline keeps moving).
//!
//! # Available Sinks
//!
//! | Sink | Purpose | Rotation |
//! |------|---------|----------|
//! | `console` | Human-readable terminal output with per-level colour | No |
//! | `file` | Append-mode log file with size/daily rotation and retention | Yes |
//! | `http` | JSON batch POST to a collection endpoint | No |
//! | `null` | Discard everything (tests, benchmarks) | No |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lumber_sinks::{FileSink, FileSinkOptions};
//!
//! let sink = FileSink::open(FileSinkOptions::new("logs/app.log"))?;
//! engine.add_sink(Arc::new(sink));
//! ```

// =============================================================================
// Sink implementations (each in its own submodule)
// =============================================================================

/// Console sink - coloured terminal output
pub mod console;

/// File sink - append-mode file with rotation and retention
pub mod file;

/// HTTP sink - JSON batch POST
pub mod http;

/// Null sink - discard all records (tests, benchmarks)
pub mod null;

// =============================================================================
// Shared types
// =============================================================================

/// Common types shared by all sinks (errors, counters)
mod common;

pub use common::{CountersSnapshot, SinkCounters, SinkError};

pub use console::{ConsoleSink, ConsoleSinkOptions};
pub use file::{FileSink, FileSinkOptions};
pub use http::{HttpSink, HttpSinkOptions};
pub use null::NullSink;
