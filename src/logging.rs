//! Logging configuration for geoquery.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr.
///
/// Stdout stays free for the `ask` payload. The filter comes from `RUST_LOG`
/// and defaults to `info`.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
