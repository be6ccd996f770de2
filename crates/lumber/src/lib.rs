//! Lumber - high-throughput asynchronous logging
//!
//! Producer threads format payloads into pooled buffers and enqueue
//! records; one background worker drains the queue and fans records out to
//! the attached sinks (console, rotating file, HTTP batch).
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use lumber::{ConsoleSink, ConsoleSinkOptions};
//!
//! lumber::init(lumber::Config::default()).unwrap();
//! lumber::add_sink(Arc::new(ConsoleSink::new(ConsoleSinkOptions::default()))).unwrap();
//!
//! lumber::info!("server listening on port {}", 8080u16);
//! lumber::sync();       // block until durably written everywhere
//! lumber::shutdown();   // drain and stop
//! ```
//!
//! # From a config file
//!
//! ```no_run
//! lumber::init_from_file("config.toml").unwrap();
//! ```
//!
//! `init_from_file` also starts the hot-reload watcher: edits to the file
//! re-apply the `logger.level` threshold on the fly (everything else is
//! load-time only). A non-empty `sink.file.log_path` attaches the file
//! sink automatically; other sinks attach via [`add_sink`].
//!
//! # Guarantees
//!
//! - Per-thread FIFO delivery to every sink.
//! - [`sync`] returns only after everything submitted before it is
//!   durably written by every sink.
//! - [`shutdown`] drains the queue completely; accepted records are never
//!   dropped at stop.
//! - Backpressure rejections are counted in [`drop_count`], never raised.
//!   The engine does not panic across this API.

mod error;
mod logger;
#[macro_use]
mod macros;

pub use error::{LoggerError, Result};
pub use logger::{
    add_sink, drop_count, enabled, flush, init, init_from_file, init_with_time_source,
    level, set_level, shutdown, submit, sync,
};

// The configuration surface and the pieces needed to build records,
// sinks, and custom time sources.
pub use lumber_config::{Config, ConfigError, FullPolicy, RotatePolicy};
pub use lumber_core::{
    Arg, FlushBarrier, Level, ManualTimeSource, Record, Sink, SystemTimeSource, TimeSource,
};
pub use lumber_sinks::{
    ConsoleSink, ConsoleSinkOptions, CountersSnapshot, FileSink, FileSinkOptions, HttpSink,
    HttpSinkOptions, NullSink, SinkError,
};
