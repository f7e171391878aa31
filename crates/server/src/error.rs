use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use guardrail_core::GuardrailError;
use thiserror::Error;

use crate::envelope::ResponseEnvelope;

/// Top-level server faults: configuration loading and anything the engine
/// raises that isn't itself turned into an outcome.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Guardrail(#[from] GuardrailError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Guardrail(GuardrailError::Envelope(_)) => StatusCode::BAD_REQUEST,
            ServerError::Guardrail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ResponseEnvelope::error(self.to_string()))).into_response()
    }
}
