//! Tracing setup for the CLI.
//!
//! Lifecycle events (resolved build, download, staged plugins) are logged at
//! `info`, staging problems at `warn`. Output goes to stderr so the server's
//! console output on stdout stays untouched.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "runfolia=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `runfolia=info` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=runfolia=debug run-folia run
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
