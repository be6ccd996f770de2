//! Coarse time
//!
//! Producers stamp records from a single atomic that a timer thread
//! refreshes every `coarse_time_interval_ms` (default 1ms). Reads are
//! relaxed; the acceptable skew is the sampling interval. This removes the
//! system-clock syscall from the submission hot path.
//!
//! The clock samples a [`TimeSource`] rather than the OS directly so tests
//! can drive rotation and timestamps deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Sampling interval for the timer thread
pub const DEFAULT_COARSE_INTERVAL: Duration = Duration::from_millis(1);

/// Where the engine's notion of "now" comes from
pub trait TimeSource: Send + Sync {
    /// Nanoseconds since the Unix epoch
    fn now_ns(&self) -> i64;
}

/// Wall-clock time source
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ns(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0)
    }
}

/// Hand-driven time source for tests
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now_ns: AtomicI64,
}

impl ManualTimeSource {
    pub fn new(now_ns: i64) -> Self {
        Self {
            now_ns: AtomicI64::new(now_ns),
        }
    }

    pub fn set_ns(&self, now_ns: i64) {
        self.now_ns.store(now_ns, Ordering::Relaxed);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ns
            .fetch_add(by.as_nanos() as i64, Ordering::Relaxed);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ns(&self) -> i64 {
        self.now_ns.load(Ordering::Relaxed)
    }
}

/// The shared coarse-time atomic
pub struct CoarseClock {
    now_ns: AtomicI64,
}

impl CoarseClock {
    pub fn new() -> Self {
        Self {
            now_ns: AtomicI64::new(0),
        }
    }

    /// Refresh from the time source (timer thread)
    #[inline]
    pub fn sample(&self, source: &dyn TimeSource) {
        self.now_ns.store(source.now_ns(), Ordering::Relaxed);
    }

    /// Current coarse time (producers, relaxed)
    #[inline]
    pub fn now_ns(&self) -> i64 {
        self.now_ns.load(Ordering::Relaxed)
    }
}

impl Default for CoarseClock {
    fn default() -> Self {
        Self::new()
    }
}
