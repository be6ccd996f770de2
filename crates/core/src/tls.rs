//! Per-thread buffer cache
//!
//! Layers a small per-thread free-list over the global [`BufferPool`] so a
//! producer normally acquires a buffer without touching the shared queue.
//! An empty cache refills in one bulk grab of `tls_buffer_count` buffers;
//! the cache drains back to the pool only in its thread-exit destructor.
//!
//! A thread that never logs initialises nothing and leaks nothing.

use std::cell::RefCell;
use std::sync::Arc;

use bytes::BytesMut;

use crate::pool::{BufferPool, PooledBuf};

thread_local! {
    static TLS_CACHE: RefCell<Option<ThreadCache>> = const { RefCell::new(None) };
}

/// Per-thread cache of pool buffers
struct ThreadCache {
    pool: Arc<BufferPool>,
    bufs: Vec<BytesMut>,
    batch_size: usize,
}

impl ThreadCache {
    fn new(pool: Arc<BufferPool>, batch_size: usize) -> Self {
        Self {
            pool,
            bufs: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    fn get(&mut self) -> BytesMut {
        if let Some(bytes) = self.bufs.pop() {
            return bytes;
        }

        // Cache empty: refill from the pool in one batch.
        self.pool.alloc_bulk(&mut self.bufs, self.batch_size);
        match self.bufs.pop() {
            Some(bytes) => bytes,
            // Pool empty too: single alloc falls back to a fresh buffer.
            None => self.pool.alloc_raw(),
        }
    }
}

impl Drop for ThreadCache {
    fn drop(&mut self) {
        // Thread exit: everything still cached goes back to the pool.
        self.pool.free_bulk(&mut self.bufs);
    }
}

/// Acquire a buffer through the calling thread's cache.
///
/// The cache is lazily initialised on first use with `batch_size` as its
/// refill quantum. If the logger was re-initialised with a new pool since
/// this thread last logged, the stale cache drains to its old pool and a
/// fresh one is built against the new pool.
pub fn acquire(pool: &Arc<BufferPool>, batch_size: usize) -> PooledBuf {
    TLS_CACHE.with(|cell| {
        let mut slot = cell.borrow_mut();
        let needs_rebuild = match slot.as_ref() {
            Some(cache) => !Arc::ptr_eq(&cache.pool, pool),
            None => true,
        };
        if needs_rebuild {
            *slot = Some(ThreadCache::new(Arc::clone(pool), batch_size.max(1)));
        }

        match slot.as_mut() {
            Some(cache) => PooledBuf::from_raw(cache.get(), Arc::clone(pool)),
            None => pool.alloc(),
        }
    })
}

#[cfg(test)]
#[path = "tls_test.rs"]
mod tls_test;
