//! Tracing setup helpers.
//!
//! The runtime logs through [`tracing`]: appends at `trace`, registrations
//! and invocations at `debug`, failures at `warn`. These helpers install a
//! formatted subscriber honoring `RUST_LOG`; applications embedding the
//! runtime in a larger program will usually install their own subscriber
//! instead and can ignore this module.

use tracing_subscriber::EnvFilter;

/// Install the default subscriber, ignoring failure if one is already set.
///
/// ```rust
/// rillflow::telemetry::init();
/// tracing::info!("runtime logging ready");
/// ```
pub fn init() {
    let _ = try_init();
}

/// Install a formatted `tracing` subscriber filtered by `RUST_LOG`
/// (defaulting to `info`). Errors if a global subscriber is already set.
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(Into::into)
}
