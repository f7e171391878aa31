use thiserror::Error;

/// Errors raised while fetching or resolving data-source payloads.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data source '{0}' is unavailable: {1}")]
    Unavailable(String, String),

    #[error("unknown data source '{0}'")]
    UnknownSource(String),

    #[error("missing field '{field}' while resolving '{path}'")]
    MissingField { path: String, field: String },

    #[error("malformed property-path descriptor: {0}")]
    MalformedDescriptor(String),
}

impl From<SourceError> for guardrail_core::GuardrailError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable(..) => guardrail_core::GuardrailError::DataSource(err.to_string()),
            SourceError::UnknownSource(_)
            | SourceError::MissingField { .. }
            | SourceError::MalformedDescriptor(_) => {
                guardrail_core::GuardrailError::Resolution(err.to_string())
            }
        }
    }
}
