//! Record source contract consumed by the REST handlers, the GraphQL resolvers and the change feed.
//!
//! A source is anything that can answer queries and apply transforms against a schema. Storage
//! engines live behind this trait; `MemorySource` is the in-process reference implementation.

pub mod memory;
pub mod observers;
pub mod query;

pub use memory::MemorySource;
pub use observers::{ListenerId, TransformListener, TransformObservers};
pub use query::*;

use crate::error::SourceError;
use crate::operation::Transform;
use crate::record::Record;
use crate::schema::Schema;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-request options forwarded to every source call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// Eager-loading hints (`include=moons,moons.planet`). Interpreted by the source, not the core.
    pub include: Vec<String>,
    /// Request headers passed through opaquely, e.g. for authorization.
    pub headers: BTreeMap<String, String>,
}

#[async_trait]
pub trait Source: Send + Sync {
    fn schema(&self) -> Arc<Schema>;

    /// Run every expression of `query` and return one result per expression, in order.
    async fn query(&self, query: Query, options: &RequestOptions) -> Result<Vec<QueryResult>, SourceError>;

    /// Apply `transform` atomically. Returns the resulting record per operation (`None` for removals).
    async fn update(&self, transform: Transform, options: &RequestOptions) -> Result<Vec<Option<Record>>, SourceError>;

    /// Listeners notified after each committed transform.
    fn observers(&self) -> &TransformObservers;

    async fn activate(&self) -> Result<(), SourceError>;

    async fn deactivate(&self) -> Result<(), SourceError>;

    fn is_activated(&self) -> bool;

    /// Drop queued requests after a failed request. Sources without a queue have nothing to clear.
    async fn clear_pending(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Run a single expression and return its result.
pub async fn query_one(
    source: &dyn Source,
    expression: QueryExpression,
    options: &RequestOptions,
) -> Result<QueryResult, SourceError> {
    let mut results = source.query(Query::single(expression), options).await?;
    if results.is_empty() {
        return Err(SourceError::Internal("source returned no result for query".into()));
    }
    Ok(results.remove(0))
}
