use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use guardrail_core::Value;
use guardrail_store::{CacheSettings, KVCache, RecordStore};
use tracing::instrument;

use crate::error::SourceError;
use crate::source::DataSource;

const PROCEDURE: &str = "wf_lender_config_get_active";
const CACHE_KEY: &str = "Guardrail:LenderConfigs";

/// Fetches the active lender configuration for one `(application_id,
/// lender_id)` pair, backed by a process-wide cache blob keyed by
/// `lender_id` so repeated lookups across lenders share one backend call.
pub struct LenderConfiguration {
    application_id: i64,
    lender_id: i64,
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn KVCache>,
    settings: CacheSettings,
}

impl LenderConfiguration {
    /// Both ids must be nonzero; this mirrors the upstream contract where
    /// `0` means "not set" rather than a valid identifier.
    pub fn new(
        application_id: i64,
        lender_id: i64,
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn KVCache>,
        settings: CacheSettings,
    ) -> Result<Self, SourceError> {
        if application_id == 0 || lender_id == 0 {
            return Err(SourceError::Unavailable(
                "lender_configuration".into(),
                "application_id and lender_id must be nonzero".into(),
            ));
        }
        Ok(Self { application_id, lender_id, store, cache, settings })
    }

    async fn load_all_configs(&self) -> Result<Value, SourceError> {
        let key = self.settings.key(CACHE_KEY);
        if let Some(cached) = self
            .cache
            .get(&key)
            .await
            .map_err(|e| SourceError::Unavailable("lender_configuration".into(), e.to_string()))?
        {
            return Ok(cached);
        }

        let rows = self
            .store
            .call(PROCEDURE, &[])
            .await
            .map_err(|e| SourceError::Unavailable("lender_configuration".into(), e.to_string()))?;

        let mut by_lender = BTreeMap::new();
        for row in rows {
            let lender_id = row
                .get("lender_id")
                .and_then(Value::as_f64)
                .ok_or_else(|| SourceError::Unavailable("lender_configuration".into(), "row missing lender_id".into()))?;
            by_lender.insert((lender_id as i64).to_string(), Value::Object(row));
        }
        let rekeyed = Value::Object(by_lender);

        self.cache
            .set(&key, rekeyed.clone(), self.settings.default_ttl)
            .await
            .map_err(|e| SourceError::Unavailable("lender_configuration".into(), e.to_string()))?;

        Ok(rekeyed)
    }
}

#[async_trait]
impl DataSource for LenderConfiguration {
    fn name(&self) -> &str {
        "lender_configuration"
    }

    #[instrument(skip_all, fields(application_id = self.application_id, lender_id = self.lender_id))]
    async fn fetch(&self) -> Result<Value, SourceError> {
        let all = self.load_all_configs().await?;
        let selected = all
            .field(&self.lender_id.to_string())
            .cloned()
            .ok_or_else(|| SourceError::Unavailable("lender_configuration".into(), format!("no active config for lender {}", self.lender_id)))?;

        Ok(self.shape(selected))
    }
}
