//! Facade error types

use thiserror::Error;

/// Result type for logger administration
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Errors surfaced by `init`/`add_sink`; the logging hot path itself
/// never returns errors.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// `init` called while a logger is already running
    #[error("logger already initialized; call shutdown() first")]
    AlreadyInitialized,

    /// Administration call before `init`
    #[error("logger not initialized")]
    NotInitialized,

    /// Configuration failed to load or validate
    #[error(transparent)]
    Config(#[from] lumber_config::ConfigError),

    /// A sink failed to initialize
    #[error(transparent)]
    Sink(#[from] lumber_sinks::SinkError),
}
