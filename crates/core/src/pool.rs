//! Grow-only lock-free buffer pool
//!
//! Pre-allocates fixed-capacity `BytesMut` buffers so the submission hot
//! path never touches the allocator. The free-list is a lock-free
//! `SegQueue`: on exhaustion a fresh buffer is heap-allocated and later
//! returned to the pool, so the pool grows monotonically and `alloc` never
//! fails. Bulk operations amortise the queue's synchronisation cost for the
//! per-thread caches.
//!
//! Every [`PooledBuf`] handle carries an `Arc` back-pointer to the pool it
//! came from and returns its buffer on drop. Returning a buffer to a
//! foreign pool is therefore impossible by construction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use crossbeam::queue::SegQueue;

/// Payload capacity of every pooled buffer (one formatted record)
pub const LOG_BUFFER_CAPACITY: usize = 4096;

/// Lock-free pool of reusable fixed-capacity buffers
pub struct BufferPool {
    /// Free-list; unbounded so returns are never dropped
    free: SegQueue<BytesMut>,

    /// Capacity of each buffer
    buffer_capacity: usize,

    /// Buffers ever created by this pool (seed + fallback allocations).
    /// Monotonic; used for conservation accounting.
    total_allocated: AtomicU64,

    /// Pool hits (buffer reused)
    hits: AtomicU64,

    /// Pool misses (fresh allocation required)
    misses: AtomicU64,

    /// Buffers returned to the free-list
    returns: AtomicU64,
}

impl BufferPool {
    /// Create a pool seeded with `pool_size` buffers of the default capacity
    pub fn new(pool_size: usize) -> Arc<Self> {
        Self::with_buffer_capacity(pool_size, LOG_BUFFER_CAPACITY)
    }

    /// Create a pool seeded with `pool_size` buffers of `buffer_capacity` bytes
    pub fn with_buffer_capacity(pool_size: usize, buffer_capacity: usize) -> Arc<Self> {
        let pool = Self {
            free: SegQueue::new(),
            buffer_capacity,
            total_allocated: AtomicU64::new(pool_size as u64),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            returns: AtomicU64::new(0),
        };
        for _ in 0..pool_size {
            pool.free.push(BytesMut::with_capacity(buffer_capacity));
        }
        Arc::new(pool)
    }

    /// Get one buffer, cleared, wrapped in a self-returning handle.
    ///
    /// Never fails: an empty free-list falls back to a fresh allocation.
    #[inline]
    pub fn alloc(self: &Arc<Self>) -> PooledBuf {
        let bytes = self.alloc_raw();
        PooledBuf {
            bytes,
            pool: Arc::clone(self),
        }
    }

    /// Get one raw buffer (for the thread cache, which wraps later)
    #[inline]
    pub(crate) fn alloc_raw(&self) -> BytesMut {
        match self.free.pop() {
            Some(mut bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                bytes.clear();
                bytes
            }
            None => self.fresh(),
        }
    }

    /// Best-effort bulk fetch into `out`; returns how many were taken.
    ///
    /// May return fewer than `n` under contention or when the free-list
    /// runs dry; callers fall back to [`BufferPool::alloc`].
    pub fn alloc_bulk(&self, out: &mut Vec<BytesMut>, n: usize) -> usize {
        let mut taken = 0;
        while taken < n {
            match self.free.pop() {
                Some(mut bytes) => {
                    bytes.clear();
                    out.push(bytes);
                    taken += 1;
                }
                None => break,
            }
        }
        self.hits.fetch_add(taken as u64, Ordering::Relaxed);
        taken
    }

    /// Return one buffer to the free-list.
    ///
    /// A zero-capacity (moved-from) buffer is ignored.
    #[inline]
    pub fn free(&self, bytes: BytesMut) {
        if bytes.capacity() == 0 {
            return;
        }
        let mut bytes = bytes;
        bytes.clear();
        self.free.push(bytes);
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    /// Return many buffers at once (thread-cache teardown)
    pub fn free_bulk(&self, bufs: &mut Vec<BytesMut>) {
        let mut returned = 0u64;
        for mut bytes in bufs.drain(..) {
            if bytes.capacity() == 0 {
                continue;
            }
            bytes.clear();
            self.free.push(bytes);
            returned += 1;
        }
        self.returns.fetch_add(returned, Ordering::Relaxed);
    }

    /// Heap fallback for an empty pool; counted so conservation still holds
    fn fresh(&self) -> BytesMut {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.total_allocated.fetch_add(1, Ordering::Relaxed);
        BytesMut::with_capacity(self.buffer_capacity)
    }

    /// Buffers currently in the free-list
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Buffers ever created by this pool
    #[inline]
    pub fn total_allocated(&self) -> u64 {
        self.total_allocated.load(Ordering::Relaxed)
    }

    /// Capacity of each pooled buffer
    #[inline]
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Point-in-time counters
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            available: self.available(),
            total_allocated: self.total_allocated(),
        }
    }
}

/// Point-in-time snapshot of pool counters
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub available: usize,
    pub total_allocated: u64,
}

impl PoolSnapshot {
    /// Fraction of allocations served from the pool (1.0 when idle)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A pooled buffer that returns itself to its originating pool on drop
pub struct PooledBuf {
    bytes: BytesMut,
    pool: Arc<BufferPool>,
}

impl PooledBuf {
    /// Wrap a raw buffer taken from `pool` (thread-cache path)
    pub(crate) fn from_raw(bytes: BytesMut, pool: Arc<BufferPool>) -> Self {
        Self { bytes, pool }
    }

    /// Formatted payload bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes still writable before hitting the fixed capacity
    #[inline]
    pub fn remaining(&self) -> usize {
        self.pool.buffer_capacity().saturating_sub(self.bytes.len())
    }

    /// Append bytes, truncating at capacity; returns how many were written
    #[inline]
    pub fn append(&mut self, data: &[u8]) -> usize {
        let writable = self.remaining().min(data.len());
        self.bytes.extend_from_slice(&data[..writable]);
        writable
    }

    #[inline]
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        let bytes = std::mem::take(&mut self.bytes);
        self.pool.free(bytes);
    }
}

impl std::fmt::Debug for PooledBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuf")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
