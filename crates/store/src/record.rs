use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use guardrail_core::Value;

use crate::error::StoreError;

/// One row returned by a [`RecordStore`] call: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Opaque relational data source, modeled as a named stored-procedure call.
///
/// Guardrail never issues ad hoc SQL; every `DataSource` addresses its
/// backing store by procedure name plus positional parameters, so the
/// trait only needs one method.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn call(&self, procedure: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;
}

/// In-memory [`RecordStore`] used by tests and local development.
///
/// Procedures are registered ahead of time with [`MemoryRecordStore::register`]
/// and return a fixed row set regardless of the parameters passed; this is
/// enough to exercise the resolution and operator layers without a real
/// database.
#[derive(Default)]
pub struct MemoryRecordStore {
    procedures: DashMap<String, Vec<Row>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, procedure: impl Into<String>, rows: Vec<Row>) {
        self.procedures.insert(procedure.into(), rows);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn call(&self, procedure: &str, _params: &[Value]) -> Result<Vec<Row>, StoreError> {
        self.procedures
            .get(procedure)
            .map(|rows| rows.clone())
            .ok_or_else(|| StoreError::UnknownProcedure(procedure.to_owned()))
    }
}
