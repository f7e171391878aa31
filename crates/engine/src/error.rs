use thiserror::Error;

/// Errors raised by the operator library and the ruleset manager.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown operator id {0}")]
    UnknownOperatorId(i64),

    #[error("unknown operator name '{0}'")]
    UnknownOperatorName(String),

    #[error("operator '{operator}' rejected its criteria: {reason}")]
    InvalidCriteria { operator: &'static str, reason: String },

    #[error("malformed rule row: {0}")]
    MalformedRow(String),

    #[error("ruleset for ({0}, {1}) could not be loaded: {2}")]
    LoadFailed(String, String, #[source] guardrail_store::StoreError),
}

impl From<EngineError> for guardrail_core::GuardrailError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownOperatorId(_)
            | EngineError::UnknownOperatorName(_)
            | EngineError::MalformedRow(_)
            | EngineError::LoadFailed(..) => guardrail_core::GuardrailError::Configuration(err.to_string()),
            EngineError::InvalidCriteria { .. } => guardrail_core::GuardrailError::Operator(err.to_string()),
        }
    }
}
