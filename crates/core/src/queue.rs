//! Bounded MPSC record queue with configurable backpressure
//!
//! Producers push concurrently; exactly one worker drains in batches.
//! The backing store is a lock-free `SegQueue`; the capacity bound is
//! enforced against a relaxed length hint, so it is approximate by design —
//! correctness never depends on an exact count, only on its monotonic
//! tendency.
//!
//! Under `Block` the push spins (yielding) for a bounded number of
//! iterations, then sleeps in short fixed steps, retrying until
//! `block_timeout_us` elapses. Under `Drop` a full queue fails the push
//! immediately. A failed push hands the record back to the caller, whose
//! drop returns the buffer to the pool - no partial state remains.
//!
//! Force pushes (flush barriers) bypass the capacity check entirely.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam::queue::SegQueue;
use lumber_config::{FullPolicy, LoggerConfig};

use crate::record::Record;

/// Spin iterations before the Block path starts sleeping
const BACKPRESSURE_SPIN_COUNT: u32 = 100;

/// Sleep step once spinning is exhausted
const BACKPRESSURE_SLEEP: Duration = Duration::from_micros(100);

/// Queue construction parameters
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum records in flight; 0 disables the bound entirely
    pub capacity: usize,

    /// What to do when the queue is full
    pub full_policy: FullPolicy,

    /// How long a Block push may wait; `None` waits forever
    pub block_timeout: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 65536,
            full_policy: FullPolicy::Block,
            block_timeout: None,
        }
    }
}

impl QueueConfig {
    /// Derive queue parameters from the `[logger]` config section
    pub fn from_logger_config(config: &LoggerConfig) -> Self {
        let perf = &config.performance;
        let block_timeout = if perf.queue_block_timeout_us < 0 {
            None
        } else {
            Some(Duration::from_micros(perf.queue_block_timeout_us as u64))
        };
        Self {
            capacity: perf.queue_capacity,
            full_policy: config.full_policy,
            block_timeout,
        }
    }
}

/// Bounded multi-producer single-consumer queue of records
pub struct RecordQueue {
    inner: SegQueue<Record>,
    len: AtomicUsize,
    config: QueueConfig,
}

impl RecordQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: SegQueue::new(),
            len: AtomicUsize::new(0),
            config,
        }
    }

    /// Push a record.
    ///
    /// `force` bypasses the capacity check (flush barriers must never be
    /// rejected). On failure the record comes back to the caller so its
    /// buffer is reclaimed by drop.
    pub fn push(&self, record: Record, force: bool) -> Result<(), Record> {
        if self.config.capacity == 0 || force {
            self.enqueue(record);
            return Ok(());
        }

        if self.size_approx() < self.config.capacity {
            self.enqueue(record);
            return Ok(());
        }

        match self.config.full_policy {
            FullPolicy::Drop => Err(record),
            FullPolicy::Block => self.push_blocking(record),
        }
    }

    /// Hybrid spin-then-sleep retry loop for the Block policy
    fn push_blocking(&self, record: Record) -> Result<(), Record> {
        let deadline = self.config.block_timeout.map(|t| Instant::now() + t);
        let mut spins = 0u32;

        loop {
            if self.size_approx() < self.config.capacity {
                self.enqueue(record);
                return Ok(());
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(record);
                }
            }

            if spins < BACKPRESSURE_SPIN_COUNT {
                spins += 1;
                std::thread::yield_now();
            } else {
                std::thread::sleep(BACKPRESSURE_SLEEP);
            }
        }
    }

    #[inline]
    fn enqueue(&self, record: Record) {
        self.inner.push(record);
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Drain up to `max` records into `dest` in arrival order.
    ///
    /// Single-consumer: only the worker thread calls this.
    pub fn pop_batch(&self, dest: &mut Vec<Record>, max: usize) -> usize {
        let mut popped = 0;
        while popped < max {
            match self.inner.pop() {
                Some(record) => {
                    dest.push(record);
                    popped += 1;
                }
                None => break,
            }
        }
        if popped > 0 {
            self.len.fetch_sub(popped, Ordering::Relaxed);
        }
        popped
    }

    /// Approximate number of records in flight (relaxed hint)
    #[inline]
    pub fn size_approx(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
