//! Payload and header formatting
//!
//! Two concerns live here:
//!
//! 1. **Payload formatting** - positional `{}` substitution into a pooled
//!    buffer via a type-dispatched [`Arg`] appender. No heap allocation;
//!    output that would exceed the buffer's fixed capacity is truncated.
//!    Arity mismatches are tolerated: surplus arguments are dropped,
//!    surplus placeholders stay in the output literally, and debug builds
//!    emit a warning.
//!
//! 2. **Header formatting** - the per-sink [`RecordFormatter`] renders
//!    `<time> <level> <thread-id> <file>:<line> <payload>\n`, caching the
//!    last-rendered epoch second so the chrono calendar conversion only
//!    runs when the whole-second portion changes.

use std::io::Write as _;

use chrono::{Local, TimeZone};

use crate::level::Level;
use crate::pool::PooledBuf;
use crate::record::Record;

// =============================================================================
// Payload formatting
// =============================================================================

/// A formatting argument, dispatched by type
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Str(&'a str),
    Char(char),
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    /// Raw pointer value; zero renders as `nullptr`, otherwise `0x<hex>`
    Ptr(usize),
}

impl<'a> Arg<'a> {
    /// Capture a raw pointer argument
    pub fn ptr<T>(ptr: *const T) -> Arg<'static> {
        Arg::Ptr(ptr as usize)
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(v: &'a str) -> Self {
        Arg::Str(v)
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(v: &'a String) -> Self {
        Arg::Str(v.as_str())
    }
}

impl From<char> for Arg<'_> {
    fn from(v: char) -> Self {
        Arg::Char(v)
    }
}

impl From<bool> for Arg<'_> {
    fn from(v: bool) -> Self {
        Arg::Bool(v)
    }
}

impl From<f32> for Arg<'_> {
    fn from(v: f32) -> Self {
        Arg::F64(v as f64)
    }
}

impl From<f64> for Arg<'_> {
    fn from(v: f64) -> Self {
        Arg::F64(v)
    }
}

macro_rules! arg_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Arg<'_> {
            fn from(v: $ty) -> Self {
                Arg::I64(v as i64)
            }
        })*
    };
}

macro_rules! arg_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Arg<'_> {
            fn from(v: $ty) -> Self {
                Arg::U64(v as u64)
            }
        })*
    };
}

arg_from_signed!(i8, i16, i32, i64, isize);
arg_from_unsigned!(u8, u16, u32, u64, usize);

/// `fmt::Write` adapter that appends to a pooled buffer, silently
/// truncating at the buffer's fixed capacity.
struct TruncWriter<'b>(&'b mut PooledBuf);

impl std::fmt::Write for TruncWriter<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.append(s.as_bytes());
        Ok(())
    }
}

fn append_arg(buf: &mut PooledBuf, arg: &Arg<'_>) {
    use std::fmt::Write as _;
    let mut writer = TruncWriter(buf);
    // Numeric conversion goes through Display straight into the fixed
    // buffer; nothing here allocates.
    let _ = match arg {
        Arg::Str(v) => writer.write_str(v),
        Arg::Char(v) => write!(writer, "{}", v),
        Arg::Bool(v) => writer.write_str(if *v { "true" } else { "false" }),
        Arg::I64(v) => write!(writer, "{}", v),
        Arg::U64(v) => write!(writer, "{}", v),
        Arg::F64(v) => write!(writer, "{}", v),
        Arg::Ptr(0) => writer.write_str("nullptr"),
        Arg::Ptr(v) => write!(writer, "0x{:x}", v),
    };
}

/// Substitute positional `{}` placeholders in `fmt` with `args`, appending
/// the result to `buf`.
///
/// Best-effort by contract: surplus arguments are ignored, surplus
/// placeholders are kept literally, and over-long output is truncated at
/// the buffer capacity. Never panics.
pub fn format_message(buf: &mut PooledBuf, fmt: &str, args: &[Arg<'_>]) {
    let bytes = fmt.as_bytes();
    let mut pos = 0;

    for arg in args {
        match find_placeholder(bytes, pos) {
            Some(at) => {
                buf.append(&bytes[pos..at]);
                append_arg(buf, arg);
                pos = at + 2;
            }
            None => break,
        }
    }

    // Remaining literal text, including any unmatched placeholders.
    buf.append(&bytes[pos..]);

    #[cfg(debug_assertions)]
    warn_on_arity_mismatch(fmt, bytes, args.len());
}

#[cfg(debug_assertions)]
fn warn_on_arity_mismatch(fmt: &str, bytes: &[u8], args: usize) {
    let mut placeholders = 0;
    let mut pos = 0;
    while let Some(at) = find_placeholder(bytes, pos) {
        placeholders += 1;
        pos = at + 2;
    }
    if placeholders != args {
        tracing::warn!(
            fmt,
            placeholders,
            args,
            "format arity mismatch; output is best-effort"
        );
    }
}

fn find_placeholder(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.len() < 2 {
        return None;
    }
    (start..bytes.len() - 1).find(|&i| bytes[i] == b'{' && bytes[i + 1] == b'}')
}

// =============================================================================
// Header formatting
// =============================================================================

/// Per-sink record formatter with a cached-second timestamp
///
/// Layout: `<time> <level> <thread-id> <file>:<line> <payload>\n`.
/// The calendar conversion re-runs only when the whole-second portion of
/// the timestamp changes; within one second the cached rendering is reused.
pub struct RecordFormatter {
    time_format: String,
    last_sec: i64,
    rendered: String,
}

impl RecordFormatter {
    pub fn new(time_format: impl Into<String>) -> Self {
        Self {
            time_format: time_format.into(),
            last_sec: i64::MIN,
            rendered: String::new(),
        }
    }

    /// Swap the strftime pattern (apply_config path); invalidates the cache
    pub fn set_time_format(&mut self, time_format: &str) {
        if self.time_format != time_format {
            self.time_format = time_format.to_string();
            self.last_sec = i64::MIN;
            self.rendered.clear();
        }
    }

    /// Append the formatted record (header, payload, newline) to `dest`
    pub fn format_record(&mut self, record: &Record, dest: &mut Vec<u8>) {
        let secs = record.timestamp_ns.div_euclid(1_000_000_000);
        if secs != self.last_sec {
            self.render_time(secs);
            self.last_sec = secs;
        }

        dest.extend_from_slice(self.rendered.as_bytes());
        let _ = write!(
            dest,
            " {} {} {}:{} ",
            record.level.as_str(),
            record.thread_hash,
            record.file,
            record.line
        );
        dest.extend_from_slice(record.payload());
        dest.push(b'\n');
    }

    fn render_time(&mut self, secs: i64) {
        use std::fmt::Write as _;
        self.rendered.clear();
        let formatted = Local
            .timestamp_opt(secs, 0)
            .single()
            .map(|dt| write!(self.rendered, "{}", dt.format(&self.time_format)));
        match formatted {
            Some(Ok(())) if !self.rendered.is_empty() => {}
            _ => {
                // Unrenderable timestamp or pattern: fall back to raw seconds.
                self.rendered.clear();
                let _ = write!(self.rendered, "{}", secs);
            }
        }
    }
}

#[cfg(test)]
#[path = "fmt_test.rs"]
mod fmt_test;
