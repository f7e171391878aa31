//! Storage abstractions the guardrail engine uses to reach external
//! systems: [`KVCache`] for memoized lookups and [`RecordStore`] for
//! stored-procedure-backed data sources. Both ship with in-memory
//! implementations suitable for tests and local development.

pub mod cache;
pub mod error;
pub mod record;

pub use cache::{CacheSettings, KVCache, MemoryKVCache};
pub use error::StoreError;
pub use record::{MemoryRecordStore, RecordStore, Row};
