//! Route table and axum mounting.

pub mod common;
pub mod feed;
pub mod graphql;
pub mod resource;
pub mod table;

pub use common::common_routes;
pub use feed::feed_routes;
pub use graphql::graphql_routes;
pub use resource::jsonapi_routes;
pub use table::{BoundParams, HandlerKind, RouteDefinition, RouteTable};

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Every router enabled by the settings, behind the request body limit.
pub fn app(state: AppState) -> Router {
    let settings = state.settings.clone();
    let mut router = common_routes(state.clone());
    if settings.jsonapi {
        router = router.merge(jsonapi_routes(state.clone()));
    }
    if state.graphql.is_some() {
        router = router.merge(graphql_routes(state.clone()));
    }
    if settings.feed {
        router = router.merge(feed_routes(state));
    }
    router.layer(RequestBodyLimitLayer::new(settings.body_limit))
}
