//! Tracing subscriber initialization.
//!
//! The engine's Non-goals exclude distributed tracing exporters and metrics
//! sinks, so this is a plain `fmt` + `EnvFilter` subscriber rather than the
//! OpenTelemetry pipeline a full acteon-style deployment would carry.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global tracing subscriber. Respects `RUST_LOG`, defaulting
/// to `info` when unset or invalid.
pub fn init() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
