//! Tracing subscriber setup for binaries and tests

use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

fn filter_layer() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Installs a global subscriber logging to stdout, filtered by `RUST_LOG`
///
/// If the environment variable is not set, the "info" level is used.
pub fn init_subscriber() {
    tracing_subscriber::registry()
        .with(filter_layer())
        .with(fmt::layer().with_target(true))
        .init();
}

/// Installs a subscriber for the current thread only, writing through the
/// test harness so output is captured per test
pub fn init_test_subscriber() -> tracing::subscriber::DefaultGuard {
    tracing_subscriber::registry()
        .with(filter_layer())
        .with(fmt::layer().with_target(true).with_test_writer())
        .set_default()
}
