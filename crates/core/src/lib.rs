//! Lumber - Core Engine
//!
//! The producer-consumer heart of the logging engine: many application
//! threads format payloads into pooled buffers and push records into a
//! bounded MPSC queue; a single worker thread drains the queue and fans
//! records out to the attached sinks.
//!
//! # Architecture
//!
//! ```text
//! [Producer threads]                       [Worker thread]
//!   ThreadCache ──get()──> PooledBuf
//!   format payload into buffer
//!   Record{level, file:line, tid, ts, buf}
//!        │ push (Block/Drop backpressure)
//!        ▼
//!   [RecordQueue (MPSC)] ──pop_batch──> for sink in sinks: log_batch()
//!                                        FlushBarrier → flush all, wake waiter
//!        ▲
//!   [TimerThread] ── coarse clock atomic read by producers
//! ```
//!
//! # Ownership invariant
//!
//! A buffer is owned by exactly one of: the pool free-list, a thread cache,
//! a producer during formatting, a queue slot, or the worker during
//! dispatch. [`PooledBuf`] carries a back-pointer to its originating pool
//! and returns itself on drop, so the invariant holds under drop, shutdown,
//! and rotation alike.

mod barrier;
mod clock;
mod fmt;
mod level;
mod pool;
mod queue;
mod record;
mod sink;
pub mod tls;
mod worker;

pub use barrier::FlushBarrier;
pub use clock::{CoarseClock, ManualTimeSource, SystemTimeSource, TimeSource,
    DEFAULT_COARSE_INTERVAL};
pub use fmt::{format_message, Arg, RecordFormatter};
pub use level::Level;
pub use pool::{BufferPool, PoolSnapshot, PooledBuf, LOG_BUFFER_CAPACITY};
pub use queue::{QueueConfig, RecordQueue};
pub use record::{current_thread_hash, Record};
pub use sink::Sink;
pub use worker::{Engine, EngineConfig};

/// Records drained per worker iteration by default
pub const DEFAULT_WORKER_BATCH_SIZE: usize = 2048;

/// Worker sleep between polls of an empty queue
pub const DEFAULT_WORKER_IDLE_SLEEP: std::time::Duration =
    std::time::Duration::from_micros(100);
