use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use guardrail_server::{AppState, GuardrailConfig};
use guardrail_store::{CacheSettings, MemoryKVCache, MemoryRecordStore};
use tracing::info;

/// Guardrail evaluation HTTP server.
#[derive(Parser, Debug)]
#[command(name = "guardrail-server", about = "Rule-driven guardrail evaluation service")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "guardrail.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    guardrail_server::telemetry::init();

    let cli = Cli::parse();

    let config = if Path::new(&cli.config).exists() {
        GuardrailConfig::load(&cli.config)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        GuardrailConfig::default()
    };

    // The record store and cache are process-wide singletons assembled once
    // here and threaded through as explicit dependencies from this point on.
    let store = Arc::new(MemoryRecordStore::new());
    let cache = Arc::new(MemoryKVCache::new());
    let cache_settings = CacheSettings::new(
        config.cache.key_prefix.clone(),
        config.cache.default_ttl_seconds.map(std::time::Duration::from_secs),
    );
    let state = AppState::new(store, cache, cache_settings);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!(address = %config.server.bind_address, "guardrail server listening");

    axum::serve(listener, guardrail_server::router(state)).await?;
    Ok(())
}
