//! Console sink - coloured terminal output
//!
//! Formats records into an internal scratch buffer and writes them to
//! stdout (or an injected writer in tests), optionally wrapped in ANSI
//! colour per level: Debug dimmed, Info green, Warn yellow, Error red,
//! Fatal magenta.
//!
//! One mutex is held for the duration of a batch so concurrent output from
//! other writers cannot interleave mid-batch. The scratch buffer drains to
//! the writer whenever it crosses `console_buffer_size_kb`.

use std::io::{self, Write};
use std::sync::Arc;

use lumber_config::Config;
use lumber_core::{Level, Record, RecordFormatter, Sink};
use owo_colors::{OwoColorize, Style};
use parking_lot::Mutex;

use crate::common::{CountersSnapshot, SinkCounters};

/// Construction options for [`ConsoleSink`]
#[derive(Debug, Clone)]
pub struct ConsoleSinkOptions {
    /// Enable ANSI colour
    pub color: bool,

    /// Scratch buffer size in bytes before draining to the writer
    pub buffer_size: usize,

    /// strftime pattern for the header timestamp
    pub time_format: String,
}

impl Default for ConsoleSinkOptions {
    fn default() -> Self {
        Self {
            color: true,
            buffer_size: 1024,
            time_format: "%Y-%m-%d %H:%M:%S".into(),
        }
    }
}

impl ConsoleSinkOptions {
    /// Derive options from the `[sink.console]` and `[logger]` sections
    pub fn from_config(config: &Config) -> Self {
        Self {
            color: true,
            buffer_size: config.sink.console.console_buffer_size(),
            time_format: config.logger.time_format.clone(),
        }
    }

    /// Disable colour (piped output)
    #[must_use]
    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }
}

/// Style for a record level; identity style when colour is off
fn level_style(level: Level, enabled: bool) -> Style {
    if !enabled {
        return Style::new();
    }
    match level {
        Level::Debug => Style::new().dimmed(),
        Level::Info => Style::new().green(),
        Level::Warn => Style::new().yellow(),
        Level::Error => Style::new().red(),
        Level::Fatal => Style::new().magenta(),
        Level::FlushBarrier => Style::new(),
    }
}

struct ConsoleState {
    formatter: RecordFormatter,
    /// One formatted record (reused)
    line: Vec<u8>,
    /// Accumulated output waiting for the writer
    scratch: Vec<u8>,
    buffer_size: usize,
    color: bool,
    writer: Box<dyn Write + Send>,
}

impl ConsoleState {
    fn append_record(&mut self, record: &Record) -> usize {
        self.line.clear();
        self.formatter.format_record(record, &mut self.line);
        let bytes = self.line.len();

        if self.color {
            // Style the line minus its newline so the reset lands before it.
            self.line.pop();
            let text = String::from_utf8_lossy(&self.line);
            let style = level_style(record.level, true);
            use std::fmt::Write as _;
            let _ = write!(
                FmtToVec(&mut self.scratch),
                "{}\n",
                text.style(style)
            );
        } else {
            self.scratch.extend_from_slice(&self.line);
        }
        bytes
    }

    fn drain_if_full(&mut self) -> io::Result<()> {
        if self.scratch.len() >= self.buffer_size {
            self.drain()?;
        }
        Ok(())
    }

    fn drain(&mut self) -> io::Result<()> {
        if !self.scratch.is_empty() {
            self.writer.write_all(&self.scratch)?;
            self.scratch.clear();
        }
        Ok(())
    }
}

/// `fmt::Write` adapter over a byte buffer
struct FmtToVec<'a>(&'a mut Vec<u8>);

impl std::fmt::Write for FmtToVec<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// Console sink
pub struct ConsoleSink {
    state: Mutex<ConsoleState>,
    counters: Arc<SinkCounters>,
}

impl ConsoleSink {
    /// Create a console sink writing to stdout
    pub fn new(options: ConsoleSinkOptions) -> Self {
        Self::with_writer(options, Box::new(io::stdout()))
    }

    /// Create a console sink writing to an arbitrary writer (tests)
    pub fn with_writer(options: ConsoleSinkOptions, writer: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                formatter: RecordFormatter::new(options.time_format),
                line: Vec::with_capacity(256),
                scratch: Vec::with_capacity(options.buffer_size),
                buffer_size: options.buffer_size.max(1),
                color: options.color,
                writer,
            }),
            counters: Arc::new(SinkCounters::new()),
        }
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    /// Counters handle that outlives the sink registration
    pub fn counters(&self) -> Arc<SinkCounters> {
        Arc::clone(&self.counters)
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn log(&self, record: &Record) {
        let mut state = self.state.lock();
        let bytes = state.append_record(record);
        self.counters.record_written(bytes as u64);
        if state.drain_if_full().is_err() {
            self.counters.record_error();
        }
    }

    fn log_batch(&self, records: &[Record]) {
        // One lock across the whole batch keeps the output readable.
        let mut state = self.state.lock();
        for record in records {
            let bytes = state.append_record(record);
            self.counters.record_written(bytes as u64);
            if state.drain_if_full().is_err() {
                self.counters.record_error();
            }
        }
        if state.drain().is_err() {
            self.counters.record_error();
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        let drained = state.drain();
        let flushed = state.writer.flush();
        if drained.is_err() || flushed.is_err() {
            self.counters.record_error();
        }
        self.counters.record_flush();
    }

    fn sync(&self) {
        // Terminals have no durable storage; pushing to the OS is all
        // a console can do.
        self.flush();
    }

    fn apply_config(&self, config: &Config) {
        let mut state = self.state.lock();
        state.buffer_size = config.sink.console.console_buffer_size().max(1);
        state.formatter.set_time_format(&config.logger.time_format);
    }
}
