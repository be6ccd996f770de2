//! The process-wide logger handle
//!
//! All producers reach one engine through a lock-free global
//! (`ArcSwapOption`): the hot path loads the handle, checks the threshold,
//! grabs a thread-cached buffer, formats, and pushes. Administration
//! (`init`/`shutdown`) serialises on a small mutex; `init` after
//! `shutdown` re-initialises cleanly.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use lumber_config::{Config, ConfigWatcher};
use lumber_core::{
    current_thread_hash, format_message, tls, Arg, BufferPool, Engine, EngineConfig, Level,
    QueueConfig, Record, Sink, SystemTimeSource, TimeSource,
};
use lumber_sinks::{FileSink, FileSinkOptions};

use crate::error::{LoggerError, Result};

static LOGGER: ArcSwapOption<LoggerCore> = ArcSwapOption::const_empty();

/// Serialises init/shutdown so re-initialisation is race-free
static ADMIN: Mutex<()> = Mutex::new(());

struct LoggerCore {
    /// Config snapshot taken at init; applied to sinks as they attach
    config: Config,

    /// Hot-reloadable severity threshold
    level: AtomicU8,

    pool: Arc<BufferPool>,
    tls_batch: usize,
    engine: Engine,

    /// Hot-reload watcher (only when initialised from a file)
    watcher: Mutex<Option<ConfigWatcher>>,
}

fn level_from_u8(value: u8) -> Level {
    match value {
        0 => Level::Debug,
        1 => Level::Info,
        2 => Level::Warn,
        3 => Level::Error,
        _ => Level::Fatal,
    }
}

/// Initialise the global logger with the system clock
pub fn init(config: Config) -> Result<()> {
    init_with_time_source(config, Arc::new(SystemTimeSource))
}

/// Initialise with an explicit time source.
///
/// The source drives record timestamps and therefore daily rotation;
/// tests and simulations inject a [`lumber_core::ManualTimeSource`] here.
pub fn init_with_time_source(config: Config, time_source: Arc<dyn TimeSource>) -> Result<()> {
    let _admin = ADMIN.lock();
    if LOGGER.load().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let perf = &config.logger.performance;
    let pool = BufferPool::new(perf.buffer_pool_size);
    let engine = Engine::start(
        QueueConfig::from_logger_config(&config.logger),
        EngineConfig {
            worker_batch_size: perf.worker_batch_size,
            ..EngineConfig::default()
        },
        time_source,
    );

    // A non-empty log path attaches the file sink up front; console and
    // HTTP sinks attach explicitly via add_sink.
    if config.file_sink_enabled() {
        let sink = FileSink::open(FileSinkOptions::from_config(&config))?;
        engine.add_sink(Arc::new(sink));
    }

    let level: Level = config.logger.level.into();
    let core = LoggerCore {
        level: AtomicU8::new(level as u8),
        tls_batch: perf.tls_buffer_count,
        pool,
        engine,
        config,
        watcher: Mutex::new(None),
    };

    LOGGER.store(Some(Arc::new(core)));
    tracing::debug!("logger initialized");
    Ok(())
}

/// Initialise from a TOML file and start the hot-reload watcher.
///
/// Only `logger.level` is re-applied when the file changes on disk.
pub fn init_from_file(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let config = Config::from_file(path)?;
    let interval = config.other.effective_reload_interval();
    init(config)?;

    let watcher = ConfigWatcher::spawn(path.to_path_buf(), interval, |reloaded| {
        set_level(reloaded.logger.level.into());
    });

    if let Some(core) = LOGGER.load_full() {
        *core.watcher.lock() = Some(watcher);
    }
    Ok(())
}

/// Attach a sink, applying the current config snapshot to it first
pub fn add_sink(sink: Arc<dyn Sink>) -> Result<()> {
    let guard = LOGGER.load();
    let core = guard.as_ref().ok_or(LoggerError::NotInitialized)?;
    sink.apply_config(&core.config);
    core.engine.add_sink(sink);
    Ok(())
}

/// Whether a record at `level` would currently be accepted.
///
/// The logging macros call this before evaluating their arguments.
#[inline]
pub fn enabled(level: Level) -> bool {
    let guard = LOGGER.load();
    match guard.as_ref() {
        Some(core) => level.is_severity() && (level as u8) >= core.level.load(Ordering::Relaxed),
        None => false,
    }
}

/// Submit one pre-formatted record. Prefer the level macros.
///
/// Never blocks beyond the configured backpressure policy and never
/// fails: a rejected push increments [`drop_count`], an uninitialised
/// logger swallows the call.
pub fn submit(level: Level, file: &'static str, line: u32, fmt: &str, args: &[Arg<'_>]) {
    let guard = LOGGER.load();
    let Some(core) = guard.as_ref() else {
        return;
    };
    if !level.is_severity() || (level as u8) < core.level.load(Ordering::Relaxed) {
        return;
    }

    let mut buf = tls::acquire(&core.pool, core.tls_batch);
    format_message(&mut buf, fmt, args);

    let record = Record::new(
        level,
        file,
        line,
        current_thread_hash(),
        core.engine.coarse_now_ns(),
        buf,
    );
    core.engine.submit(record);
}

/// Change the severity threshold at runtime
pub fn set_level(level: Level) {
    if !level.is_severity() {
        return;
    }
    if let Some(core) = LOGGER.load_full() {
        core.level.store(level as u8, Ordering::Relaxed);
    }
}

/// Current severity threshold (Info when uninitialised)
pub fn level() -> Level {
    match LOGGER.load_full() {
        Some(core) => level_from_u8(core.level.load(Ordering::Relaxed)),
        None => Level::Info,
    }
}

/// Push every sink's pending bytes to the OS (no barrier, no blocking
/// on the queue)
pub fn flush() {
    if let Some(core) = LOGGER.load_full() {
        core.engine.flush_sinks();
    }
}

/// Block until everything submitted before this call is durably written
/// by every sink. No-op when the logger is stopped.
pub fn sync() {
    if let Some(core) = LOGGER.load_full() {
        core.engine.sync();
    }
}

/// Records rejected by backpressure since init
pub fn drop_count() -> u64 {
    match LOGGER.load_full() {
        Some(core) => core.engine.drop_count(),
        None => 0,
    }
}

/// Drain the queue, stop the worker and timer, flush and sync every
/// sink, and release the global handle. Safe to call twice; `init` may
/// follow.
pub fn shutdown() {
    let _admin = ADMIN.lock();
    let Some(core) = LOGGER.swap(None) else {
        return;
    };
    if let Some(mut watcher) = core.watcher.lock().take() {
        watcher.stop();
    }
    core.engine.shutdown();
    tracing::debug!("logger shut down");
}
