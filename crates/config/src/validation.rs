//! Configuration validation
//!
//! Runs after TOML deserialization. Most range constraints are already
//! enforced by the field types (unsigned integers); what remains is the
//! strictly-positive checks and the time-format probe.

use std::fmt::Write;

use chrono::Local;

use crate::error::{ConfigError, Result};
use crate::Config;

/// Validate a parsed configuration
pub(crate) fn validate_config(config: &Config) -> Result<()> {
    validate_time_format(&config.logger.time_format)?;

    let perf = &config.logger.performance;
    ensure_positive(perf.worker_batch_size, "logger.performance.worker_batch_size")?;
    ensure_positive(perf.buffer_pool_size, "logger.performance.buffer_pool_size")?;
    ensure_positive(perf.tls_buffer_count, "logger.performance.tls_buffer_count")?;

    ensure_positive(
        config.sink.file.file_buffer_size_kb,
        "sink.file.file_buffer_size_kb",
    )?;
    ensure_positive(config.sink.file.rotate_size_mb, "sink.file.rotate_size_mb")?;
    ensure_positive(
        config.sink.console.console_buffer_size_kb,
        "sink.console.console_buffer_size_kb",
    )?;

    Ok(())
}

/// Reject empty patterns and patterns strftime cannot render.
///
/// chrono surfaces an invalid specifier as a formatting error when the
/// delayed format is written out, so a probe render catches both cases.
fn validate_time_format(format: &str) -> Result<()> {
    if format.is_empty() {
        return Err(ConfigError::invalid_value(
            "logger.time_format",
            "pattern must not be empty",
        ));
    }

    let mut rendered = String::new();
    let probe = Local::now();
    if write!(rendered, "{}", probe.format(format)).is_err() {
        return Err(ConfigError::invalid_value(
            "logger.time_format",
            format!("'{}' is not a valid strftime pattern", format),
        ));
    }
    if rendered.is_empty() {
        return Err(ConfigError::invalid_value(
            "logger.time_format",
            format!("'{}' renders to an empty string", format),
        ));
    }

    Ok(())
}

fn ensure_positive(value: usize, field: &'static str) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::invalid_value(field, "must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_time_format_rejected() {
        let result = Config::from_str("[logger]\ntime_format = \"\"");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field, .. }) if field == "logger.time_format"
        ));
    }

    #[test]
    fn test_invalid_time_format_rejected() {
        let result = Config::from_str("[logger]\ntime_format = \"%Q%Q%Q\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_plain_time_format_accepted() {
        // A literal-only pattern renders to itself, which is non-empty and fine.
        let config = Config::from_str("[logger]\ntime_format = \"ts\"").unwrap();
        assert_eq!(config.logger.time_format, "ts");
    }

    #[test]
    fn test_zero_worker_batch_size_rejected() {
        let result = Config::from_str("[logger.performance]\nworker_batch_size = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let result = Config::from_str("[logger.performance]\nbuffer_pool_size = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_tls_count_rejected() {
        let result = Config::from_str("[logger.performance]\ntls_buffer_count = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_rotate_size_rejected() {
        let result = Config::from_str("[sink.file]\nrotate_size_mb = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_queue_capacity_accepted() {
        // Capacity 0 means unbounded, not invalid.
        let config = Config::from_str("[logger.performance]\nqueue_capacity = 0").unwrap();
        assert_eq!(config.logger.performance.queue_capacity, 0);
    }
}
