//! Diagnostic logging bootstrap.
//!
//! Logs go to stderr so the transcript printed on stdout stays clean.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `SPUR_CHAT_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Builds the filter from an explicit directive, then `RUST_LOG`, then
/// [`DEFAULT_LOG_FILTER`]. An unparsable directive falls through to the next
/// source.
pub fn log_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init_logging(directive: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
