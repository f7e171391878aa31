use async_trait::async_trait;
use guardrail_core::Value;
use guardrail_store::RecordStore;
use tracing::instrument;

use crate::error::SourceError;
use crate::source::DataSource;

const PROCEDURE: &str = "wf_applications_get";

/// Fetches one loan application by id and exposes its stored JSON payload
/// as the `application.*` property tree.
pub struct Application {
    application_id: i64,
    store: std::sync::Arc<dyn RecordStore>,
}

impl Application {
    pub fn new(application_id: i64, store: std::sync::Arc<dyn RecordStore>) -> Self {
        Self { application_id, store }
    }
}

#[async_trait]
impl DataSource for Application {
    fn name(&self) -> &str {
        "application"
    }

    #[instrument(skip_all, fields(application_id = self.application_id))]
    async fn fetch(&self) -> Result<Value, SourceError> {
        let rows = self
            .store
            .call(PROCEDURE, &[Value::Int(self.application_id)])
            .await
            .map_err(|e| SourceError::Unavailable("application".into(), e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Unavailable("application".into(), "no matching application".into()))?;

        let payload = row
            .get("payload")
            .and_then(Value::as_str)
            .ok_or_else(|| SourceError::Unavailable("application".into(), "row has no payload field".into()))?;

        let parsed: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| SourceError::Unavailable("application".into(), format!("payload is not valid JSON: {e}")))?;

        let value = Value::from_json(parsed);
        if !matches!(value, Value::Object(_)) {
            return Err(SourceError::Unavailable(
                "application".into(),
                "payload did not decode to an object".into(),
            ));
        }

        Ok(self.shape(value))
    }
}
