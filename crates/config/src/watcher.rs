//! Config hot reload
//!
//! A polling watcher restats the config file on an interval and reloads it
//! when the modification time changes. Only the level is meant to be applied
//! from a reload; everything else is load-time-only to avoid mid-stream
//! semantic shifts, so the callback receives the full parsed config and the
//! caller picks out what it honours.
//!
//! A malformed edit leaves the previous configuration intact: parse or
//! validation failures are logged and skipped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Deserialize;

use crate::Config;

/// Default hot-reload polling interval in milliseconds
pub const DEFAULT_RELOAD_INTERVAL_MS: u64 = 1000;

/// Granularity of the watcher's stop checks while sleeping
const STOP_POLL_SLICE: Duration = Duration::from_millis(50);

/// `[other]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OtherConfig {
    /// Config file polling interval in milliseconds; 0 falls back to the
    /// default (~1000)
    pub reload_interval_ms: u64,
}

impl Default for OtherConfig {
    fn default() -> Self {
        Self {
            reload_interval_ms: DEFAULT_RELOAD_INTERVAL_MS,
        }
    }
}

impl OtherConfig {
    /// Polling interval with the zero fallback applied
    pub fn effective_reload_interval(&self) -> Duration {
        if self.reload_interval_ms == 0 {
            Duration::from_millis(DEFAULT_RELOAD_INTERVAL_MS)
        } else {
            Duration::from_millis(self.reload_interval_ms)
        }
    }
}

/// Background watcher that reloads a config file when it changes
///
/// Dropping the watcher stops the polling thread.
pub struct ConfigWatcher {
    running: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Spawn a watcher for `path`, invoking `on_reload` with each
    /// successfully parsed config after the file changes on disk.
    pub fn spawn<F>(path: impl Into<PathBuf>, interval: Duration, on_reload: F) -> Self
    where
        F: Fn(&Config) + Send + 'static,
    {
        let path = path.into();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("lumber-config-watch".into())
            .spawn(move || {
                watch_loop(&path, interval, &thread_running, on_reload);
            })
            .ok();

        if handle.is_none() {
            running.store(false, Ordering::Relaxed);
            tracing::error!("failed to spawn config watcher thread");
        }

        Self { running, handle }
    }

    /// Stop the watcher and join its thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_loop<F>(path: &PathBuf, interval: Duration, running: &AtomicBool, on_reload: F)
where
    F: Fn(&Config),
{
    let mut last_mtime = file_mtime(path);

    while running.load(Ordering::Relaxed) {
        sleep_interruptible(interval, running);
        if !running.load(Ordering::Relaxed) {
            break;
        }

        let current = file_mtime(path);
        if current == last_mtime {
            continue;
        }
        last_mtime = current;

        match Config::from_file(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "config reloaded");
                on_reload(&config);
            }
            Err(e) => {
                // Keep the previous configuration.
                tracing::warn!(path = %path.display(), error = %e, "config reload skipped");
            }
        }
    }
}

/// Sleep for `interval` but wake early when the watcher is stopped
fn sleep_interruptible(interval: Duration, running: &AtomicBool) {
    let mut remaining = interval;
    while !remaining.is_zero() && running.load(Ordering::Relaxed) {
        let slice = remaining.min(STOP_POLL_SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

fn file_mtime(path: &PathBuf) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
