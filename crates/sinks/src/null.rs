//! Null sink - counts and discards every record
//!
//! Useful as a baseline in benchmarks and as a probe in tests: it exposes
//! the same counters as the real sinks without touching any destination.

use std::sync::Arc;

use lumber_config::Config;
use lumber_core::{Record, Sink};

use crate::common::{CountersSnapshot, SinkCounters};

/// A sink that discards all records
#[derive(Default)]
pub struct NullSink {
    counters: Arc<SinkCounters>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    /// Counters handle that outlives the sink registration
    pub fn counters(&self) -> Arc<SinkCounters> {
        Arc::clone(&self.counters)
    }
}

impl Sink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    fn log(&self, record: &Record) {
        self.counters.record_written(record.payload().len() as u64);
    }

    fn flush(&self) {
        self.counters.record_flush();
    }

    fn sync(&self) {}

    fn apply_config(&self, _config: &Config) {}
}
