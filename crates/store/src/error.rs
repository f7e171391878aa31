use thiserror::Error;

/// Errors raised by [`crate::KVCache`] and [`crate::RecordStore`]
/// implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown stored procedure: {0}")]
    UnknownProcedure(String),
}
