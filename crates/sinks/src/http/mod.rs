//! HTTP sink - JSON batch POST to a collection endpoint
//!
//! Buffers records as pending entries and POSTs `{"logs": [...]}` to the
//! configured endpoint once the pending count reaches `batch_size`, or on
//! flush. Each entry carries `timestamp`, `level`, `thread_id`, `file`,
//! `line`, `content`. Sends retry up to `max_retries` with a linear
//! backoff; on persistent failure the oldest entries beyond
//! `2 x batch_size` are dropped so memory stays bounded.
//!
//! Delivery is best-effort by contract - this sink never blocks producers
//! (only the worker) and never fails the pipeline. `sync` is a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use lumber_config::Config;
use lumber_core::{Record, Sink};
use parking_lot::Mutex;
use serde::Serialize;

use crate::common::{CountersSnapshot, SinkCounters, SinkError};

/// Base delay for the linear retry backoff
const RETRY_BACKOFF_STEP: Duration = Duration::from_millis(100);

/// Construction options for [`HttpSink`]
#[derive(Debug, Clone)]
pub struct HttpSinkOptions {
    /// Server base URL, e.g. `http://127.0.0.1:8080`
    pub url: String,

    /// Path the batch is POSTed to
    pub endpoint: String,

    /// Extra request headers
    pub headers: Vec<(String, String)>,

    /// Request timeout
    pub timeout: Duration,

    /// Retries per batch beyond the first attempt
    pub max_retries: u32,

    /// Pending entries that trigger a send
    pub batch_size: usize,

    /// strftime pattern for entry timestamps
    pub time_format: String,
}

impl HttpSinkOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            endpoint: "/logs".into(),
            headers: Vec::new(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            batch_size: 100,
            time_format: "%Y-%m-%d %H:%M:%S".into(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// One pending log entry, already detached from its pooled buffer
#[derive(Debug, Clone, Serialize)]
struct HttpEntry {
    timestamp: String,
    level: &'static str,
    thread_id: u64,
    file: &'static str,
    line: u32,
    content: String,
}

#[derive(Serialize)]
struct HttpBatch<'a> {
    logs: &'a [HttpEntry],
}

struct HttpState {
    pending: Vec<HttpEntry>,
    time_format: String,
}

/// HTTP batch sink
pub struct HttpSink {
    options: HttpSinkOptions,
    client: reqwest::blocking::Client,
    state: Mutex<HttpState>,
    counters: Arc<SinkCounters>,
}

impl HttpSink {
    /// Build the sink and its HTTP client.
    ///
    /// # Errors
    ///
    /// Fails when the URL is empty or the client cannot be constructed.
    pub fn new(options: HttpSinkOptions) -> Result<Self, SinkError> {
        if options.url.is_empty() {
            return Err(SinkError::config("http sink requires a server url"));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| SinkError::init(e.to_string()))?;

        let time_format = options.time_format.clone();
        Ok(Self {
            options,
            client,
            state: Mutex::new(HttpState {
                pending: Vec::new(),
                time_format,
            }),
            counters: Arc::new(SinkCounters::new()),
        })
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    /// Counters handle that outlives the sink registration
    pub fn counters(&self) -> Arc<SinkCounters> {
        Arc::clone(&self.counters)
    }

    /// Entries currently buffered and unsent
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn entry_from(&self, record: &Record, time_format: &str) -> HttpEntry {
        let secs = record.timestamp_ns.div_euclid(1_000_000_000);
        let timestamp = Local
            .timestamp_opt(secs, 0)
            .single()
            .map(|dt| dt.format(time_format).to_string())
            .unwrap_or_else(|| secs.to_string());

        HttpEntry {
            timestamp,
            level: record.level.as_str(),
            thread_id: record.thread_hash,
            file: record.file,
            line: record.line,
            content: String::from_utf8_lossy(record.payload()).into_owned(),
        }
    }

    /// Send everything pending; on persistent failure keep the batch but
    /// trim the overflow.
    fn flush_pending(&self, state: &mut HttpState) {
        if state.pending.is_empty() {
            return;
        }

        let batch = HttpBatch {
            logs: &state.pending,
        };
        let sent = self.send_with_retries(&batch);

        if sent {
            use std::sync::atomic::Ordering;
            let count = state.pending.len() as u64;
            let bytes: u64 = state.pending.iter().map(|e| e.content.len() as u64).sum();
            self.counters.records_written.fetch_add(count, Ordering::Relaxed);
            self.counters.bytes_written.fetch_add(bytes, Ordering::Relaxed);
            state.pending.clear();
        } else if state.pending.len() > self.options.batch_size * 2 {
            // Bound memory: shed the oldest batch worth of entries.
            let shed = self.options.batch_size.min(state.pending.len());
            state.pending.drain(..shed);
            tracing::warn!(shed, "http sink overflow; oldest entries dropped");
        }
    }

    fn send_with_retries(&self, batch: &HttpBatch<'_>) -> bool {
        let url = format!("{}{}", self.options.url, self.options.endpoint);

        for attempt in 0..=self.options.max_retries {
            match self.post_once(&url, batch) {
                Ok(()) => return true,
                Err(e) => {
                    self.counters.record_error();
                    tracing::warn!(
                        url = %url,
                        attempt = attempt + 1,
                        error = %e,
                        "http batch send failed"
                    );
                }
            }
            if attempt < self.options.max_retries {
                // Linear backoff: 100ms, 200ms, 300ms, ...
                std::thread::sleep(RETRY_BACKOFF_STEP * (attempt + 1));
            }
        }
        false
    }

    fn post_once(&self, url: &str, batch: &HttpBatch<'_>) -> Result<(), SinkError> {
        let mut request = self.client.post(url).json(batch);
        for (name, value) in &self.options.headers {
            request = request.header(name, value);
        }

        let response = request.send().map_err(|e| SinkError::send(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SinkError::send(format!("status {}", response.status())))
        }
    }
}

impl Sink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn log(&self, record: &Record) {
        let mut state = self.state.lock();
        let entry = self.entry_from(record, &state.time_format);
        state.pending.push(entry);
        if state.pending.len() >= self.options.batch_size {
            self.flush_pending(&mut state);
        }
    }

    fn log_batch(&self, records: &[Record]) {
        let mut state = self.state.lock();
        for record in records {
            let entry = self.entry_from(record, &state.time_format);
            state.pending.push(entry);
        }
        if state.pending.len() >= self.options.batch_size {
            self.flush_pending(&mut state);
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        self.flush_pending(&mut state);
        self.counters.record_flush();
    }

    /// No durable storage on this side of the wire
    fn sync(&self) {}

    fn apply_config(&self, config: &Config) {
        let mut state = self.state.lock();
        if state.time_format != config.logger.time_format {
            state.time_format = config.logger.time_format.clone();
        }
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;
