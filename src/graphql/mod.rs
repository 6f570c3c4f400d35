//! GraphQL endpoint over the record source.
//!
//! The schema is built once from the record schema; every request gets its own
//! [`RequestScope`] so relationship batching and caching never cross request boundaries.

pub mod builder;
pub mod filter;
pub mod loader;

pub use builder::{build_schema, DATETIME_SCALAR, DATE_SCALAR};
pub use loader::{RelatedKey, RelatedLoader, RequestScope};

use crate::source::{RequestOptions, Source};
use async_graphql::dynamic::Schema as GraphqlSchema;
use std::sync::Arc;

/// Execute one request with a fresh resolver scope.
pub async fn execute(
    schema: &GraphqlSchema,
    source: Arc<dyn Source>,
    options: RequestOptions,
    request: async_graphql::Request,
) -> async_graphql::Response {
    let request = request.data(RequestScope::new(source, options));
    schema.execute(request).await
}
