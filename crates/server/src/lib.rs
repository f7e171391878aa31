//! The HTTP front door: parses request envelopes, assembles (or
//! substitutes, in test mode) data sources, and invokes the guardrail
//! engine.

pub mod config;
pub mod envelope;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::GuardrailConfig;
pub use error::ServerError;
pub use routes::router;
pub use state::AppState;
