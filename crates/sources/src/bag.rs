use std::collections::BTreeMap;
use std::sync::Arc;

use guardrail_core::Value;

use crate::error::SourceError;
use crate::source::DataSource;

/// The per-request collection of already-fetched data-source payloads,
/// keyed by source name (`application`, `lender_configuration`, `test`,
/// ...). Built once per request and handed to the resolver; has no state
/// of its own beyond the map.
#[derive(Debug, Clone, Default)]
pub struct DataSourceBag {
    payloads: BTreeMap<String, Value>,
}

impl DataSourceBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already-fetched payload directly, bypassing `DataSource`
    /// entirely. Used by the request router's test mode, where the
    /// request's `datasets` object stands in for real sources.
    pub fn insert(&mut self, name: impl Into<String>, payload: Value) {
        self.payloads.insert(name.into(), payload);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.payloads.get(name)
    }

    /// Fetch a source and insert its payload under its own name.
    pub async fn fetch_and_insert(&mut self, source: &dyn DataSource) -> Result<(), SourceError> {
        let payload = source.fetch().await?;
        self.payloads.insert(source.name().to_owned(), payload);
        Ok(())
    }

    /// Convenience for assembling a bag from several live sources.
    pub async fn assemble(sources: &[Arc<dyn DataSource>]) -> Result<Self, SourceError> {
        let mut bag = Self::new();
        for source in sources {
            bag.fetch_and_insert(source.as_ref()).await?;
        }
        Ok(bag)
    }
}
