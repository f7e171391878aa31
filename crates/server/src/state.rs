use std::sync::Arc;

use guardrail_engine::{GuardrailService, RuleManager};
use guardrail_store::{CacheSettings, KVCache, RecordStore};

/// Everything the router needs, assembled once per process and shared
/// across requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub cache: Arc<dyn KVCache>,
    pub rules: Arc<RuleManager>,
    pub engine: GuardrailService,
    pub cache_settings: CacheSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<dyn KVCache>, cache_settings: CacheSettings) -> Self {
        let rules = Arc::new(RuleManager::new(store.clone(), cache_settings.clone()));
        Self { store, cache, rules, engine: GuardrailService::new(), cache_settings }
    }
}
