//! The engine: worker thread, timer thread, sink set
//!
//! One long-lived worker drains the queue in batches and fans records out
//! to every attached sink; a timer thread keeps the coarse clock fresh.
//! Shutdown drains the queue completely before the worker exits, so no
//! accepted record is ever dropped at stop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};

use crate::barrier::FlushBarrier;
use crate::clock::{CoarseClock, TimeSource, DEFAULT_COARSE_INTERVAL};
use crate::queue::{QueueConfig, RecordQueue};
use crate::record::Record;
use crate::sink::Sink;
use crate::{DEFAULT_WORKER_BATCH_SIZE, DEFAULT_WORKER_IDLE_SLEEP};

/// Worker and timer tuning
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Records drained per worker iteration
    pub worker_batch_size: usize,

    /// Sleep between polls of an empty queue
    pub idle_sleep: Duration,

    /// Coarse clock sampling interval
    pub coarse_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_batch_size: DEFAULT_WORKER_BATCH_SIZE,
            idle_sleep: DEFAULT_WORKER_IDLE_SLEEP,
            coarse_interval: DEFAULT_COARSE_INTERVAL,
        }
    }
}

/// The running engine: queue, sinks, worker and timer threads
pub struct Engine {
    queue: Arc<RecordQueue>,
    sinks: Arc<ArcSwap<Vec<Arc<dyn Sink>>>>,
    clock: Arc<CoarseClock>,
    running: Arc<AtomicBool>,
    drop_count: Arc<AtomicU64>,

    /// Orders the running-check-then-push window against shutdown's
    /// running flip: pushes hold this shared, the flip holds it exclusive.
    /// Anything enqueued while `running` read true therefore lands before
    /// the flip, and the worker's final drain is guaranteed to see it.
    gate: RwLock<()>,

    worker: Mutex<Option<JoinHandle<()>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Start the worker and timer threads
    pub fn start(
        queue_config: QueueConfig,
        engine_config: EngineConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let queue = Arc::new(RecordQueue::new(queue_config));
        let sinks: Arc<ArcSwap<Vec<Arc<dyn Sink>>>> =
            Arc::new(ArcSwap::from_pointee(Vec::new()));
        let clock = Arc::new(CoarseClock::new());
        let running = Arc::new(AtomicBool::new(true));

        // Producers must see a sane timestamp before the timer's first tick.
        clock.sample(time_source.as_ref());

        let worker = {
            let queue = Arc::clone(&queue);
            let sinks = Arc::clone(&sinks);
            let running = Arc::clone(&running);
            let batch_size = engine_config.worker_batch_size.max(1);
            let idle_sleep = engine_config.idle_sleep;
            std::thread::Builder::new()
                .name("lumber-worker".into())
                .spawn(move || worker_loop(&queue, &sinks, &running, batch_size, idle_sleep))
        };

        let timer = {
            let clock = Arc::clone(&clock);
            let running = Arc::clone(&running);
            let interval = engine_config.coarse_interval;
            std::thread::Builder::new()
                .name("lumber-timer".into())
                .spawn(move || timer_loop(&clock, time_source, &running, interval))
        };

        if worker.is_err() || timer.is_err() {
            // Spawning only fails when the process is out of resources; the
            // engine degrades to a synchronous no-op rather than panicking.
            running.store(false, Ordering::Release);
            tracing::error!("failed to spawn engine threads; logging disabled");
        }

        Self {
            queue,
            sinks,
            clock,
            running,
            drop_count: Arc::new(AtomicU64::new(0)),
            gate: RwLock::new(()),
            worker: Mutex::new(worker.ok()),
            timer: Mutex::new(timer.ok()),
        }
    }

    /// Attach a sink. Safe while the worker is running.
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&sink));
            next
        });
    }

    /// Submit one record. Returns false (and counts a drop) on rejection.
    pub fn submit(&self, record: Record) -> bool {
        // Shared gate: shutdown cannot flip `running` between the check
        // and the push, so an accepted record is always drained.
        let _gate = self.gate.read();
        if !self.running.load(Ordering::Relaxed) {
            // Stopped engine: swallow silently; the record's buffer returns
            // to the pool via drop.
            return false;
        }
        match self.queue.push(record, false) {
            Ok(()) => true,
            Err(rejected) => {
                drop(rejected);
                self.drop_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Flush every sink from the calling thread (no barrier)
    pub fn flush_sinks(&self) {
        for sink in self.sinks.load().iter() {
            sink.flush();
        }
    }

    /// Block until the worker has flushed everything enqueued before now.
    ///
    /// No-op when the engine is stopped (the final drain already ran).
    pub fn sync(&self) {
        let barrier = Arc::new(FlushBarrier::new());
        {
            let _gate = self.gate.read();
            if !self.running.load(Ordering::Acquire) {
                return;
            }
            let record = Record::barrier(Arc::clone(&barrier));
            if self.queue.push(record, true).is_err() {
                return;
            }
        }

        // The barrier was enqueued while the engine was running (the gate
        // orders the push before any shutdown flip), so the worker's drain
        // or the shutdown sweep is guaranteed to reach it and wake us.
        barrier.wait();
    }

    /// Current coarse time in nanoseconds
    #[inline]
    pub fn coarse_now_ns(&self) -> i64 {
        self.clock.now_ns()
    }

    /// Records rejected by backpressure so far
    pub fn drop_count(&self) -> u64 {
        self.drop_count.load(Ordering::Relaxed)
    }

    /// Approximate queue depth
    pub fn queue_depth(&self) -> usize {
        self.queue.size_approx()
    }

    /// Snapshot of the attached sinks
    pub fn sinks(&self) -> Arc<Vec<Arc<dyn Sink>>> {
        self.sinks.load_full()
    }

    /// Whether the engine accepts submissions
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the engine: drain the queue, join both threads, flush and sync
    /// every sink. Idempotent.
    pub fn shutdown(&self) {
        {
            // Exclusive gate: waits out any in-flight check-then-push, so
            // every record and barrier accepted so far is already in the
            // queue when `running` flips.
            let _gate = self.gate.write();
            if !self.running.swap(false, Ordering::AcqRel) {
                return;
            }
        }
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
        if let Some(timer) = self.timer.lock().take() {
            let _ = timer.join();
        }

        // Backstop for anything the worker's final empty check raced past;
        // with the gate in place this is normally empty, but a stranded
        // barrier here would leave its waiter blocked forever.
        let mut leftovers: Vec<Record> = Vec::new();
        while self.queue.pop_batch(&mut leftovers, 64) > 0 {
            let sink_set = self.sinks.load();
            dispatch_batch(&leftovers, &sink_set);
            leftovers.clear();
        }

        for sink in self.sinks.load().iter() {
            sink.flush();
            sink.sync();
        }
        tracing::debug!("engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Main drain loop.
///
/// Contiguous runs of ordinary records go to each sink as one batch; a
/// flush barrier first flushes the preceding run, then every sink, then
/// wakes its waiter. After `running` clears, the loop keeps draining until
/// the queue reports empty, so shutdown loses nothing.
fn worker_loop(
    queue: &RecordQueue,
    sinks: &ArcSwap<Vec<Arc<dyn Sink>>>,
    running: &AtomicBool,
    batch_size: usize,
    idle_sleep: Duration,
) {
    let mut batch: Vec<Record> = Vec::with_capacity(batch_size);

    while running.load(Ordering::Relaxed) || queue.size_approx() > 0 {
        let count = queue.pop_batch(&mut batch, batch_size);
        if count == 0 {
            if running.load(Ordering::Relaxed) {
                std::thread::sleep(idle_sleep);
                continue;
            }
            break;
        }

        let sink_set = sinks.load();
        dispatch_batch(&batch, &sink_set);

        // Dropping the records returns their buffers to the pool.
        batch.clear();
    }
}

fn dispatch_batch(batch: &[Record], sinks: &[Arc<dyn Sink>]) {
    let mut run_start = 0;

    for (i, record) in batch.iter().enumerate() {
        if !record.is_barrier() {
            continue;
        }

        let run = &batch[run_start..i];
        if !run.is_empty() {
            for sink in sinks {
                sink.log_batch(run);
            }
        }
        run_start = i + 1;

        // Barrier: everything enqueued before it is now handed to the
        // sinks; flush them all, then release the waiter.
        for sink in sinks {
            sink.flush();
        }
        if let Some(waiter) = record.waiter() {
            waiter.complete();
        }
    }

    let run = &batch[run_start..];
    if !run.is_empty() {
        for sink in sinks {
            sink.log_batch(run);
        }
    }
}

fn timer_loop(
    clock: &CoarseClock,
    source: Arc<dyn TimeSource>,
    running: &AtomicBool,
    interval: Duration,
) {
    while running.load(Ordering::Relaxed) {
        clock.sample(source.as_ref());
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod worker_test;
