//! One-shot flush barrier
//!
//! A producer embeds a barrier in a `FlushBarrier` record, force-enqueues
//! it past any backpressure, and blocks on `wait`. When the worker reaches
//! the record it flushes every sink and calls `complete`, releasing the
//! producer. Completion is sticky: a `wait` after `complete` returns
//! immediately.

use parking_lot::{Condvar, Mutex};

/// One-shot synchronisation point between a producer and the worker
pub struct FlushBarrier {
    done: Mutex<bool>,
    cond: Condvar,
}

impl FlushBarrier {
    pub fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Block until the worker has flushed everything enqueued before the
    /// barrier. No timeout: shutdown drains the queue, so the barrier is
    /// always reached.
    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    /// Wake the waiting producer (worker side)
    pub fn complete(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cond.notify_all();
    }

    /// Whether the barrier has already completed
    pub fn is_complete(&self) -> bool {
        *self.done.lock()
    }
}

impl Default for FlushBarrier {
    fn default() -> Self {
        Self::new()
    }
}
