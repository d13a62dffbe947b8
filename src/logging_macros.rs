#![warn(clippy::all, rust_2018_idioms)]

/// Logging macros that prefix every message with `[file:module:line]`.
/// All events go through `tracing`; crates still on `log` reach the same
/// subscriber via the `tracing-log` bridge installed by the binary.
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        tracing::trace!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        tracing::debug!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        tracing::info!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        tracing::warn!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

/*
Example output:
  [src/app/resource_explorer/query_engine.rs:azdash::app::resource_explorer::query_engine:175] Querying 2 subscription(s) with policy AbortOnError

Log level guidelines:

TRACE: individual items inside loops, raw page contents
DEBUG: page fetches, token cache hits and refreshes, per-subscription counts
INFO:  query and deletion completions, summary statistics
WARN:  fallbacks (directory unavailable, API version retries, isolated
       subscription failures)
ERROR: failed operations reported to the user

Never log bearer tokens or client secrets at any level.
*/
