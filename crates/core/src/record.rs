//! Log records
//!
//! A record bundles one formatted payload with its metadata. It is
//! move-only: the payload buffer travels producer → queue → worker and
//! returns to its pool when the record drops, wherever that happens
//! (normal dispatch, a rejected push, or shutdown drain).

use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::barrier::FlushBarrier;
use crate::level::Level;
use crate::pool::PooledBuf;

/// One logical log event
pub struct Record {
    /// Severity, or the flush-barrier sentinel
    pub level: Level,

    /// Source file (static, borrowed from the call site)
    pub file: &'static str,

    /// Source line
    pub line: u32,

    /// Hash of the submitting thread's id
    pub thread_hash: u64,

    /// Coarse-clock timestamp, nanoseconds since the Unix epoch
    pub timestamp_ns: i64,

    /// Formatted payload; `None` only for flush barriers
    payload: Option<PooledBuf>,

    /// Barrier waiter; `Some` only for flush barriers
    waiter: Option<Arc<FlushBarrier>>,
}

impl Record {
    /// Build an ordinary record around a formatted payload buffer
    pub fn new(
        level: Level,
        file: &'static str,
        line: u32,
        thread_hash: u64,
        timestamp_ns: i64,
        payload: PooledBuf,
    ) -> Self {
        Self {
            level,
            file,
            line,
            thread_hash,
            timestamp_ns,
            payload: Some(payload),
            waiter: None,
        }
    }

    /// Build a flush-barrier record. Carries no buffer.
    pub fn barrier(waiter: Arc<FlushBarrier>) -> Self {
        Self {
            level: Level::FlushBarrier,
            file: "",
            line: 0,
            thread_hash: 0,
            timestamp_ns: 0,
            payload: None,
            waiter: Some(waiter),
        }
    }

    /// Whether this record is a flush barrier
    #[inline]
    pub fn is_barrier(&self) -> bool {
        self.level == Level::FlushBarrier
    }

    /// Payload bytes (empty for barriers)
    #[inline]
    pub fn payload(&self) -> &[u8] {
        self.payload.as_ref().map(PooledBuf::as_slice).unwrap_or(&[])
    }

    /// The barrier waiter, if any (worker side)
    pub fn waiter(&self) -> Option<&Arc<FlushBarrier>> {
        self.waiter.as_ref()
    }
}

thread_local! {
    static THREAD_HASH: Cell<u64> = const { Cell::new(0) };
}

/// Hash of the current thread's id, computed once per thread.
///
/// Zero is reserved as the "unset" sentinel; a hash that lands on zero is
/// nudged to one.
pub fn current_thread_hash() -> u64 {
    THREAD_HASH.with(|cell| {
        let cached = cell.get();
        if cached != 0 {
            return cached;
        }
        let mut hasher = DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        let hash = hasher.finish().max(1);
        cell.set(hash);
        hash
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BufferPool;

    #[test]
    fn test_record_owns_payload() {
        let pool = BufferPool::new(2);
        let mut buf = pool.alloc();
        buf.append(b"hello");

        let record = Record::new(Level::Info, file!(), line!(), 7, 123, buf);
        assert_eq!(record.payload(), b"hello");
        assert!(!record.is_barrier());
        assert_eq!(pool.available(), 1);

        // Dropping the record returns the buffer.
        drop(record);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_barrier_record_has_no_payload() {
        let record = Record::barrier(Arc::new(FlushBarrier::new()));
        assert!(record.is_barrier());
        assert!(record.payload().is_empty());
        assert!(record.waiter().is_some());
    }

    #[test]
    fn test_thread_hash_is_stable_within_thread() {
        let a = current_thread_hash();
        let b = current_thread_hash();
        assert_eq!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn test_thread_hash_differs_across_threads() {
        let here = current_thread_hash();
        let there = std::thread::spawn(current_thread_hash).join().unwrap();
        assert_ne!(here, there);
    }
}
