//! Structured Logger
//!
//! Wraps `tracing` to provide console output, a rolling NDJSON file, and
//! environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::verbosity::LogVerbosity;

/// Initialize the global logger. `RUST_LOG`, when set, overrides `verbosity`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, verbosity: LogVerbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.as_filter()));

    // Writes NDJSON to `<log_dir>/chatbridge.log.YYYY-MM-DD`
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "chatbridge.log");

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
