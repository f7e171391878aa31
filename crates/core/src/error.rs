use thiserror::Error;

/// Errors surfaced by the guardrail evaluation pipeline.
///
/// `Envelope`, `Configuration`, and `DataSource` are top-level faults: the
/// engine never starts (or aborts with no partial outcomes) and the caller
/// returns `{success: false, error: ...}`. `Resolution` and `Operator` are
/// per-rule faults: the engine converts them into a `FAIL`/`RESTRICT`
/// outcome and continues per the short-circuit rule rather than
/// propagating them to the caller — see
/// `guardrail_engine::GuardrailService::evaluate`.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// The request envelope was malformed (missing/invalid `application_id`,
    /// `type`, or `area`).
    #[error("invalid request envelope: {0}")]
    Envelope(String),

    /// The ruleset could not be loaded, or references an unknown operator.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A backing `RecordStore` or `KVCache` call failed or returned
    /// malformed data.
    #[error("data source unavailable: {0}")]
    DataSource(String),

    /// A rule or sub-rule referenced a property path that could not be
    /// resolved against the data-source bag.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// An operator's criteria was malformed, or the operator raised an
    /// evaluation-time fault (invalid regex, unparseable date, wrong
    /// criteria shape).
    #[error("operator error: {0}")]
    Operator(String),

    /// Evaluation was cancelled between rules.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl GuardrailError {
    /// `true` for the two error kinds that are recorded as a `FAIL`/`RESTRICT`
    /// outcome rather than aborting the whole evaluation.
    pub fn is_outcome_level(&self) -> bool {
        matches!(self, Self::Resolution(_) | Self::Operator(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_level_classification() {
        assert!(GuardrailError::Resolution("x".into()).is_outcome_level());
        assert!(GuardrailError::Operator("x".into()).is_outcome_level());
        assert!(!GuardrailError::Envelope("x".into()).is_outcome_level());
        assert!(!GuardrailError::Configuration("x".into()).is_outcome_level());
        assert!(!GuardrailError::DataSource("x".into()).is_outcome_level());
        assert!(!GuardrailError::Cancelled.is_outcome_level());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            GuardrailError::Operator("invalid regex".into()).to_string(),
            "operator error: invalid regex"
        );
    }
}
