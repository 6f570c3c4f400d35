//! Shared application state for all routes. Built once per schema, immutable afterwards.

use crate::codec::ResourceCodec;
use crate::config::ServerSettings;
use crate::error::SchemaError;
use crate::feed::PubSub;
use crate::graphql::build_schema;
use crate::routes::table::RouteTable;
use crate::source::Source;
use async_graphql::dynamic::Schema as GraphqlSchema;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn Source>,
    pub codec: Arc<ResourceCodec>,
    pub routes: Arc<RouteTable>,
    /// `None` when the GraphQL endpoint is disabled.
    pub graphql: Option<GraphqlSchema>,
    pub pubsub: Arc<dyn PubSub>,
    pub settings: Arc<ServerSettings>,
}

impl AppState {
    /// Derive codec, route table and GraphQL schema from the source's schema.
    pub fn build(source: Arc<dyn Source>, pubsub: Arc<dyn PubSub>, settings: ServerSettings) -> Result<Self, SchemaError> {
        let schema = source.schema();
        let codec = ResourceCodec::new(schema.clone())?;
        let routes = RouteTable::build(&schema, &codec, settings.readonly);
        let graphql = if settings.graphql {
            Some(build_schema(schema)?)
        } else {
            None
        };
        tracing::debug!(routes = routes.len(), graphql = settings.graphql, "application state built");
        Ok(AppState {
            source,
            codec: Arc::new(codec),
            routes: Arc::new(routes),
            graphql,
            pubsub,
            settings: Arc::new(settings),
        })
    }
}
