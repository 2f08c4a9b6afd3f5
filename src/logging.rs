//! Tracing subscriber setup for the command-line binary.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "folioscope=info";

/// Log to stderr, filtered by `RUST_LOG` (default `folioscope=info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
