use async_trait::async_trait;
use guardrail_core::Value;

use crate::error::SourceError;

/// A named tree of facts available to rules via dotted paths.
///
/// `fetch` produces the payload; `shape` is an optional normalization
/// pass over the raw payload and defaults to a no-op, since most concrete
/// sources already return data in the shape rules expect.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The name this source is addressed by in property paths, e.g.
    /// `application` for the path `application.borrower.email`.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Value, SourceError>;

    fn shape(&self, raw: Value) -> Value {
        raw
    }
}
