//! Logging setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

/// Initialize logging for the embedding application.
///
/// With a file path, logs go through a non-blocking appender and the
/// returned [`WorkerGuard`] must be held until shutdown so buffered
/// entries are flushed; without one, logs go to stderr and no guard is
/// needed. `RUST_LOG` takes precedence over `level`.
///
/// Calling this twice is a setup bug and panics the process the way
/// any double subscriber registration does.
pub fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some(log_path) = file_path else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return None;
    };

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
