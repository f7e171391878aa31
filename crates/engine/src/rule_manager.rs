use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use guardrail_core::{Criteria, Rule, RuleSet, SubRule};
use guardrail_store::{CacheSettings, RecordStore, Row};
use tracing::{debug, instrument};

use crate::error::EngineError;
use crate::operators::OperatorLibrary;

/// Stored procedure that returns rule rows for a `(type, area)` pair. The
/// exact name is a deployment detail; this one is this service's own
/// convention rather than a fixed upstream contract.
const RULES_PROCEDURE: &str = "wf_guardrail_rules_get";

fn cache_key(type_: &str, area: &str) -> String {
    format!("RuleSet:{type_}:{area}")
}

struct CacheEntry {
    rule_set: Arc<RuleSet>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Loads and caches [`RuleSet`]s keyed by `(type, area)`.
///
/// A ruleset is parsed once from its configuration rows and validated (all
/// `operator_id`s known) before being cached; later lookups are served
/// from the in-process cache without touching the record store again,
/// until `settings.default_ttl` elapses and the entry is evicted lazily
/// on its next read.
pub struct RuleManager {
    store: Arc<dyn RecordStore>,
    operators: OperatorLibrary,
    cache: DashMap<String, CacheEntry>,
    settings: CacheSettings,
}

impl RuleManager {
    pub fn new(store: Arc<dyn RecordStore>, settings: CacheSettings) -> Self {
        Self { store, operators: OperatorLibrary::new(), cache: DashMap::new(), settings }
    }

    #[instrument(skip(self), fields(type_, area))]
    pub async fn get_rule_set(&self, type_: &str, area: &str) -> Result<Arc<RuleSet>, EngineError> {
        let key = self.settings.key(&cache_key(type_, area));
        if let Some(entry) = self.cache.get(&key) {
            if !entry.is_expired() {
                debug!(%key, "ruleset cache hit");
                return Ok(Arc::clone(&entry.rule_set));
            }
            drop(entry);
            self.cache.remove(&key);
        }

        let rows = self
            .store
            .call(
                RULES_PROCEDURE,
                &[guardrail_core::Value::String(type_.to_owned()), guardrail_core::Value::String(area.to_owned())],
            )
            .await
            .map_err(|e| EngineError::LoadFailed(type_.to_owned(), area.to_owned(), e))?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            rules.push(self.parse_row(&row)?);
        }

        for rule in &rules {
            if !self.operators.contains_id(rule.operator_id) {
                return Err(EngineError::UnknownOperatorId(rule.operator_id));
            }
        }

        let rule_set = Arc::new(RuleSet::new(rules));
        let expires_at = self.settings.default_ttl.map(|d| Instant::now() + d);
        self.cache.insert(key, CacheEntry { rule_set: Arc::clone(&rule_set), expires_at });
        Ok(rule_set)
    }

    fn parse_row(&self, row: &Row) -> Result<Rule, EngineError> {
        let get_str = |field: &str| -> Option<String> {
            row.get(field).and_then(guardrail_core::Value::as_str).map(str::to_owned)
        };

        let type_ = get_str("type").ok_or_else(|| invalid_row("type"))?;
        let area = get_str("area").ok_or_else(|| invalid_row("area"))?;
        let sequence = row
            .get("sequence")
            .and_then(guardrail_core::Value::as_f64)
            .ok_or_else(|| invalid_row("sequence"))? as i64;
        let operator_id = row
            .get("operator_id")
            .and_then(guardrail_core::Value::as_f64)
            .ok_or_else(|| invalid_row("operator_id"))? as i64;

        let target_json = get_str("target").ok_or_else(|| invalid_row("target"))?;
        let target: Vec<String> = serde_json::from_str(&target_json)
            .map_err(|e| EngineError::MalformedRow(format!("malformed target JSON: {e}")))?;

        let criteria = get_str("criteria").filter(|s| !s.is_empty()).map(|raw| Criteria::parse(&raw));

        let sub_rule = get_str("sub_rule")
            .filter(|s| !s.is_empty() && s != "null")
            .map(|raw| serde_json::from_str::<SubRule>(&raw))
            .transpose()
            .map_err(|e| EngineError::MalformedRow(format!("malformed sub_rule JSON: {e}")))?;

        let on_pass = get_str("on_pass").ok_or_else(|| invalid_row("on_pass"))?;
        let on_fail = get_str("on_fail").ok_or_else(|| invalid_row("on_fail"))?;

        Ok(Rule {
            type_,
            area,
            sequence,
            target,
            operator_id,
            criteria,
            sub_rule,
            on_pass: parse_action(&on_pass)?,
            on_fail: parse_action(&on_fail)?,
            pass: get_str("pass").unwrap_or_default(),
            fail: get_str("fail").unwrap_or_default(),
            warn: get_str("warn").unwrap_or_default(),
        })
    }
}

fn invalid_row(field: &str) -> EngineError {
    EngineError::MalformedRow(format!("missing or malformed field '{field}'"))
}

fn parse_action(raw: &str) -> Result<guardrail_core::RuleAction, EngineError> {
    match raw.to_uppercase().as_str() {
        "CONTINUE" => Ok(guardrail_core::RuleAction::Continue),
        "WARN" => Ok(guardrail_core::RuleAction::Warn),
        "RESTRICT" => Ok(guardrail_core::RuleAction::Restrict),
        other => Err(EngineError::MalformedRow(format!("unknown action '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use guardrail_store::MemoryRecordStore;

    use super::*;

    fn rule_row(sequence: i64, operator_id: i64) -> Row {
        let mut row = Row::new();
        row.insert("type".into(), guardrail_core::Value::String("app".into()));
        row.insert("area".into(), guardrail_core::Value::String("guardrail".into()));
        row.insert("sequence".into(), guardrail_core::Value::Int(sequence));
        row.insert("target".into(), guardrail_core::Value::String(r#"["test.field_a"]"#.into()));
        row.insert("operator_id".into(), guardrail_core::Value::Int(operator_id));
        row.insert("criteria".into(), guardrail_core::Value::Null);
        row.insert("sub_rule".into(), guardrail_core::Value::Null);
        row.insert("on_pass".into(), guardrail_core::Value::String("CONTINUE".into()));
        row.insert("on_fail".into(), guardrail_core::Value::String("RESTRICT".into()));
        row.insert("pass".into(), guardrail_core::Value::String("ok".into()));
        row.insert("fail".into(), guardrail_core::Value::String("bad".into()));
        row.insert("warn".into(), guardrail_core::Value::String(String::new()));
        row
    }

    #[tokio::test]
    async fn loads_and_caches_a_valid_ruleset() {
        let store = Arc::new(MemoryRecordStore::new());
        store.register(RULES_PROCEDURE, vec![rule_row(1, 1)]);
        let manager = RuleManager::new(store.clone(), CacheSettings::default());

        let set = manager.get_rule_set("app", "guardrail").await.unwrap();
        assert_eq!(set.len(), 1);

        // Second call must be served from cache: clearing the backing store doesn't break it.
        store.register(RULES_PROCEDURE, vec![]);
        let set2 = manager.get_rule_set("app", "guardrail").await.unwrap();
        assert_eq!(set2.len(), 1);
    }

    #[tokio::test]
    async fn unknown_operator_id_fails_at_load_time() {
        let store = Arc::new(MemoryRecordStore::new());
        store.register(RULES_PROCEDURE, vec![rule_row(1, 999)]);
        let manager = RuleManager::new(store, CacheSettings::default());

        let err = manager.get_rule_set("app", "guardrail").await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownOperatorId(999)));
    }

    #[tokio::test]
    async fn expired_entry_is_reloaded_from_the_store() {
        let store = Arc::new(MemoryRecordStore::new());
        store.register(RULES_PROCEDURE, vec![rule_row(1, 1)]);
        let settings = CacheSettings::new(String::new(), Some(std::time::Duration::from_millis(1)));
        let manager = RuleManager::new(store.clone(), settings);

        manager.get_rule_set("app", "guardrail").await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        store.register(RULES_PROCEDURE, vec![rule_row(1, 1), rule_row(2, 1)]);
        let set = manager.get_rule_set("app", "guardrail").await.unwrap();
        assert_eq!(set.len(), 2);
    }
}
