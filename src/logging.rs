//! Logging utilities for the driver
//!
//! Provides helpers for initializing tracing subscribers. Without the
//! `logging` feature every helper is a no-op and events are only seen by a
//! subscriber the host application installs.

#[cfg(feature = "logging")]
use tracing_subscriber::{fmt, EnvFilter};

use crate::connection::DriverParams;

/// Initialize logging with default settings
///
/// # Environment Variables
/// - `RUST_LOG` - Log level filter (default: "warn")
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("warn")
}

/// Initialize logging with a specific level
///
/// # Arguments
/// * `level` - Log level (trace, debug, info, warn, error, off)
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init();
}

/// Initialize logging from the `LOG_LEVEL` and `LOG_FILENAME` driver
/// parameters. Output is appended to the log file when one is given.
///
/// # Errors
///
/// Returns the I/O error when the log file cannot be opened.
#[cfg(feature = "logging")]
pub fn init_from_params(params: &DriverParams) -> std::io::Result<()> {
    let filter = EnvFilter::new(params.log_level.as_filter());

    match &params.log_filename {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let _ = fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = fmt().with_env_filter(filter).try_init();
        }
    }
    Ok(())
}

/// Initialize logging for tests
///
/// Uses a more verbose format suitable for debugging tests.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

// Stub implementations when logging feature is disabled
#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_from_params(_params: &DriverParams) -> std::io::Result<()> {
    Ok(())
}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
