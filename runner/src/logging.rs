//! Tracing setup for the runner launcher.
//!
//! Runner diagnostics are regular `tracing` events carrying `runner` and
//! `jump` fields. A runner with its debug flag set logs them at `info`,
//! which the default filter shows; otherwise they stay at `debug`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,tag_runner=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; falls back to [`DEFAULT_FILTER`].
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=tag_runner=debug runner --it
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
