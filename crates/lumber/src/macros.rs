//! Logging macros
//!
//! Each macro captures the call site (`file!()`/`line!()`), gates on the
//! current threshold *before* evaluating its arguments, converts the
//! arguments through [`crate::Arg`], and submits. Payloads use positional
//! `{}` placeholders:
//!
//! ```no_run
//! lumber::info!("connected to {} in {}ms", "db-primary", 12u32);
//! lumber::error!("write failed, retrying={}", true);
//! ```
//!
//! Non-`Copy` values are passed by reference: `lumber::info!("{}", &name)`.

/// Submit a record at an explicit level
#[macro_export]
macro_rules! log {
    ($level:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {
        if $crate::enabled($level) {
            $crate::submit(
                $level,
                file!(),
                line!(),
                $fmt,
                &[$($crate::Arg::from($arg)),*],
            );
        }
    };
}

/// Log at Debug level
#[macro_export]
macro_rules! debug {
    ($($rest:tt)*) => { $crate::log!($crate::Level::Debug, $($rest)*) };
}

/// Log at Info level
#[macro_export]
macro_rules! info {
    ($($rest:tt)*) => { $crate::log!($crate::Level::Info, $($rest)*) };
}

/// Log at Warn level
#[macro_export]
macro_rules! warn {
    ($($rest:tt)*) => { $crate::log!($crate::Level::Warn, $($rest)*) };
}

/// Log at Error level
#[macro_export]
macro_rules! error {
    ($($rest:tt)*) => { $crate::log!($crate::Level::Error, $($rest)*) };
}

/// Log at Fatal level
#[macro_export]
macro_rules! fatal {
    ($($rest:tt)*) => { $crate::log!($crate::Level::Fatal, $($rest)*) };
}
