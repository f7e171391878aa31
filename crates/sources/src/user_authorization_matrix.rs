use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use guardrail_core::Value;
use guardrail_store::{CacheSettings, KVCache, RecordStore, Row};
use tracing::instrument;

use crate::error::SourceError;
use crate::source::DataSource;

const PROCEDURE: &str = "wf_guardrail_user_Authorization_matrix";
const CACHE_KEY: &str = "Guardrail:UserAuthorizationMatrix";

/// Builds a four-way index of user/role/group/title membership from one
/// wide stored-procedure result set, so rules can test any of the four
/// directions (`users.<email>.role`, `roles.<role>`, ...) without a
/// separate query per direction.
pub struct UserAuthorizationMatrix {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn KVCache>,
    settings: CacheSettings,
}

impl UserAuthorizationMatrix {
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<dyn KVCache>, settings: CacheSettings) -> Self {
        Self { store, cache, settings }
    }

    fn push_unique(list: &mut Vec<Value>, item: String) {
        if !list.iter().any(|v| v.as_str() == Some(item.as_str())) {
            list.push(Value::String(item));
        }
    }

    fn field_str(row: &Row, field: &str) -> Option<String> {
        row.get(field).and_then(Value::as_str).map(str::to_owned)
    }

    fn build_matrix(rows: Vec<Row>) -> Value {
        let mut users: BTreeMap<String, (Vec<Value>, Vec<Value>, Vec<Value>)> = BTreeMap::new();
        let mut roles: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        let mut titles: BTreeMap<String, Vec<Value>> = BTreeMap::new();

        for row in &rows {
            let Some(email) = Self::field_str(row, "email") else { continue };
            let email = email.trim().to_lowercase();
            if email.is_empty() {
                continue;
            }

            let role = Self::field_str(row, "role");
            let group = Self::field_str(row, "group_name");
            let title = Self::field_str(row, "title");

            let entry = users.entry(email.clone()).or_default();
            if let Some(role) = &role {
                Self::push_unique(&mut entry.0, role.clone());
                Self::push_unique(roles.entry(role.clone()).or_default(), email.clone());
            }
            if let Some(group) = &group {
                Self::push_unique(&mut entry.1, group.clone());
                Self::push_unique(groups.entry(group.clone()).or_default(), email.clone());
            }
            if let Some(title) = &title {
                Self::push_unique(&mut entry.2, title.clone());
                Self::push_unique(titles.entry(title.clone()).or_default(), email.clone());
            }
        }

        let users = users
            .into_iter()
            .map(|(email, (role, group, title))| {
                let mut obj = BTreeMap::new();
                obj.insert("role".to_owned(), Value::Array(role));
                obj.insert("group".to_owned(), Value::Array(group));
                obj.insert("title".to_owned(), Value::Array(title));
                (email, Value::Object(obj))
            })
            .collect();

        let to_value_map = |m: BTreeMap<String, Vec<Value>>| {
            Value::Object(m.into_iter().map(|(k, v)| (k, Value::Array(v))).collect())
        };

        let mut root = BTreeMap::new();
        root.insert("users".to_owned(), Value::Object(users));
        root.insert("roles".to_owned(), to_value_map(roles));
        root.insert("groups".to_owned(), to_value_map(groups));
        root.insert("titles".to_owned(), to_value_map(titles));
        Value::Object(root)
    }
}

#[async_trait]
impl DataSource for UserAuthorizationMatrix {
    fn name(&self) -> &str {
        "user_authorization_matrix"
    }

    #[instrument(skip_all)]
    async fn fetch(&self) -> Result<Value, SourceError> {
        let key = self.settings.key(CACHE_KEY);
        if let Some(cached) = self
            .cache
            .get(&key)
            .await
            .map_err(|e| SourceError::Unavailable("user_authorization_matrix".into(), e.to_string()))?
        {
            return Ok(cached);
        }

        let rows = self
            .store
            .call(PROCEDURE, &[])
            .await
            .map_err(|e| SourceError::Unavailable("user_authorization_matrix".into(), e.to_string()))?;

        let matrix = Self::build_matrix(rows);

        self.cache
            .set(&key, matrix.clone(), self.settings.default_ttl)
            .await
            .map_err(|e| SourceError::Unavailable("user_authorization_matrix".into(), e.to_string()))?;

        Ok(self.shape(matrix))
    }
}

#[cfg(test)]
mod tests {
    use guardrail_store::MemoryKVCache;
    use guardrail_store::MemoryRecordStore;

    use super::*;

    fn row(email: &str, role: &str, group: &str, title: &str) -> Row {
        let mut r = Row::new();
        r.insert("email".into(), Value::String(email.into()));
        r.insert("role".into(), Value::String(role.into()));
        r.insert("group_name".into(), Value::String(group.into()));
        r.insert("title".into(), Value::String(title.into()));
        r
    }

    #[tokio::test]
    async fn builds_all_four_directions() {
        let store = Arc::new(MemoryRecordStore::new());
        store.register(
            PROCEDURE,
            vec![
                row(" Alice@Example.com ", "admin", "ops", "lead"),
                row("bob@example.com", "viewer", "ops", "lead"),
            ],
        );
        let cache = Arc::new(MemoryKVCache::new());
        let source = UserAuthorizationMatrix::new(store, cache, CacheSettings::default());

        let matrix = source.fetch().await.unwrap();
        let users = matrix.field("users").unwrap();
        assert!(users.field("alice@example.com").is_some());
        assert!(users.field(" Alice@Example.com ").is_none());

        let ops_members = matrix.field("groups").unwrap().field("ops").unwrap().as_array().unwrap();
        assert_eq!(ops_members.len(), 2);
    }

    #[tokio::test]
    async fn skips_rows_with_empty_email() {
        let store = Arc::new(MemoryRecordStore::new());
        store.register(PROCEDURE, vec![row("  ", "admin", "ops", "lead")]);
        let cache = Arc::new(MemoryKVCache::new());
        let source = UserAuthorizationMatrix::new(store, cache, CacheSettings::default());

        let matrix = source.fetch().await.unwrap();
        let users = matrix.field("users").unwrap();
        assert_eq!(users.as_array().map(<[Value]>::len).unwrap_or(0), 0);
        assert!(matches!(users, Value::Object(map) if map.is_empty()));
    }

    #[tokio::test]
    async fn duplicate_role_assignments_are_not_repeated() {
        let store = Arc::new(MemoryRecordStore::new());
        store.register(
            PROCEDURE,
            vec![row("a@b.com", "admin", "ops", "lead"), row("a@b.com", "admin", "ops", "lead")],
        );
        let cache = Arc::new(MemoryKVCache::new());
        let source = UserAuthorizationMatrix::new(store, cache, CacheSettings::default());

        let matrix = source.fetch().await.unwrap();
        let role_list = matrix.field("users").unwrap().field("a@b.com").unwrap().field("role").unwrap();
        assert_eq!(role_list.as_array().unwrap().len(), 1);
    }
}
