use std::collections::BTreeMap;

use guardrail_core::{AggregateResult, GuardrailError, Value};
use serde::{Deserialize, Serialize};

/// The inbound request envelope: which application, which ruleset, and
/// (in test mode) the datasets to substitute for live data sources.
#[derive(Debug, Deserialize)]
pub struct RequestEnvelope {
    pub application_id: i64,
    #[serde(rename = "type")]
    pub type_: String,
    pub area: String,
    #[serde(default)]
    pub testing: bool,
    #[serde(default)]
    pub datasets: Option<BTreeMap<String, serde_json::Value>>,
}

impl RequestEnvelope {
    /// Validates the envelope per the router's contract: a positive
    /// `application_id` and non-empty `type`/`area`.
    pub fn validate(&self) -> Result<(), GuardrailError> {
        if self.application_id <= 0 {
            return Err(GuardrailError::Envelope("application_id must be a positive integer".into()));
        }
        if self.type_.trim().is_empty() {
            return Err(GuardrailError::Envelope("type must not be empty".into()));
        }
        if self.area.trim().is_empty() {
            return Err(GuardrailError::Envelope("area must not be empty".into()));
        }
        if self.testing && self.datasets.is_none() {
            return Err(GuardrailError::Envelope("testing mode requires a datasets object".into()));
        }
        Ok(())
    }

    pub fn datasets_as_values(&self) -> BTreeMap<String, Value> {
        self.datasets
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|(name, json)| (name, Value::from_json(json)))
            .collect()
    }
}

/// The outbound response envelope.
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AggregateResult>,
}

impl ResponseEnvelope {
    pub fn ok(data: AggregateResult) -> Self {
        Self { success: data.passed, error: None, data: Some(data) }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()), data: None }
    }
}
