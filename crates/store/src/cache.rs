use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use guardrail_core::Value;
use tokio::time::Instant;

use crate::error::StoreError;

/// Opaque key-value cache used to memoize data-source payloads between
/// evaluations.
///
/// Implementations must be `Send + Sync`. The guardrail engine treats this
/// purely as a cache: a miss is not an error, and callers must be able to
/// recompute the value on miss.
#[async_trait]
pub trait KVCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Key-prefixing and default-TTL policy shared by every cache-backed data
/// source and the ruleset cache.
///
/// `key_prefix` defaults to empty, so the out-of-the-box cache keys
/// (`Guardrail:LenderConfigs`, `RuleSet:<type>:<area>`, ...) are unchanged;
/// a deployment running several guardrail instances against one shared
/// cache backend sets a prefix to keep their entries apart.
#[derive(Debug, Clone, Default)]
pub struct CacheSettings {
    pub key_prefix: String,
    pub default_ttl: Option<Duration>,
}

impl CacheSettings {
    pub fn new(key_prefix: impl Into<String>, default_ttl: Option<Duration>) -> Self {
        Self { key_prefix: key_prefix.into(), default_ttl }
    }

    /// Apply the configured prefix to a fixed cache key name, unprefixed
    /// when no prefix is configured.
    pub fn key(&self, name: &str) -> String {
        if self.key_prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{}{name}", self.key_prefix)
        }
    }
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// In-memory [`KVCache`] backed by a [`DashMap`]. Entries are evicted
/// lazily on read once their TTL has elapsed.
///
/// This is the implementation used by tests and by the server's default
/// configuration; a deployment backed by an external cache provides its
/// own implementation of the trait.
#[derive(Default)]
pub struct MemoryKVCache {
    data: DashMap<String, Entry>,
}

impl MemoryKVCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KVCache for MemoryKVCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if let Some(entry) = self.data.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.data.insert(key.to_owned(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        match self.data.remove(key) {
            Some((_, entry)) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_unprefixed_by_default() {
        let settings = CacheSettings::default();
        assert_eq!(settings.key("Guardrail:LenderConfigs"), "Guardrail:LenderConfigs");
    }

    #[test]
    fn key_applies_configured_prefix() {
        let settings = CacheSettings::new("tenant-a:", None);
        assert_eq!(settings.key("Guardrail:LenderConfigs"), "tenant-a:Guardrail:LenderConfigs");
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryKVCache::new();
        cache.set("k", Value::Int(7), None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(Value::Int(7)));
    }

    #[tokio::test]
    async fn get_on_missing_key_is_none_not_error() {
        let cache = MemoryKVCache::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_whether_key_existed() {
        let cache = MemoryKVCache::new();
        assert!(!cache.delete("k").await.unwrap());
        cache.set("k", Value::Bool(true), None).await.unwrap();
        assert!(cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expiry_via_get() {
        let cache = MemoryKVCache::new();
        cache
            .set("k", Value::String("short-lived".into()), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
