//! Structured logging setup.
//!
//! Logs go to stderr through a non-blocking writer so stdout stays free
//! for user-facing output. `RUST_LOG` overrides the verbosity-derived
//! filter when set.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive; logs are flushed on drop.
#[must_use = "dropping the guard stops log output"]
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Default filter directive for a verbosity level.
///
/// 0 shows warnings only, 1 adds info, 2 adds debug for this crate,
/// 3 or more traces everything.
pub fn filter_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,quantpull=info",
        2 => "info,quantpull=debug",
        _ => "trace",
    }
}

/// Install the global tracing subscriber.
///
/// Calling this more than once keeps the first subscriber; the returned
/// guard is still valid.
pub fn init_logging(verbosity: u8) -> LoggingGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .compact();

    // Already initialised (e.g. by a test harness): keep the existing one
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();

    LoggingGuard { _worker: guard }
}
