//! The sink capability set
//!
//! A sink consumes records, formats them into its own scratch buffer, and
//! emits them somewhere (console, file, network). The worker is the only
//! caller of `log`/`log_batch`/`flush`/`sync`; `apply_config` may arrive
//! from any thread, so implementations protect their mutable state with a
//! mutex and take `&self`.
//!
//! The set of sinks is open-ended: anything implementing this trait can be
//! registered with the engine, and the worker treats all sinks uniformly.

use lumber_config::Config;

use crate::record::Record;

/// An output adapter consuming records
pub trait Sink: Send + Sync {
    /// Short identifier used in diagnostics
    fn name(&self) -> &'static str;

    /// Format and emit one record
    fn log(&self, record: &Record);

    /// Emit many records; the default dispatches one-by-one.
    ///
    /// Sinks that benefit from batching (one lock, one write) override this.
    fn log_batch(&self, records: &[Record]) {
        for record in records {
            self.log(record);
        }
    }

    /// Force pending bytes to the OS
    fn flush(&self);

    /// Force OS buffers to stable storage (fsync-equivalent).
    /// No-op for sinks without a durable backing store.
    fn sync(&self);

    /// Re-apply runtime-mutable settings from a config snapshot
    fn apply_config(&self, config: &Config);
}
