//! GraphQL-over-HTTP at `/graphql`: POST with a single or batched body, GET with query parameters.
//!
//! Every request of a batch gets its own resolver scope, so loader caches never cross requests.

use crate::extractors::ForwardedHeaders;
use crate::graphql::execute;
use crate::source::RequestOptions;
use crate::state::AppState;
use async_graphql::{BatchRequest, BatchResponse};
use async_graphql_axum::{GraphQLBatchRequest, GraphQLResponse};
use axum::{extract::State, http::StatusCode, routing::get, Router};

async fn graphql(
    State(state): State<AppState>,
    headers: ForwardedHeaders,
    batch: GraphQLBatchRequest,
) -> Result<GraphQLResponse, StatusCode> {
    let schema = state.graphql.as_ref().ok_or(StatusCode::NOT_FOUND)?;
    let options = RequestOptions {
        include: Vec::new(),
        headers: headers.into_inner(),
    };
    let response = match batch.into_inner() {
        BatchRequest::Single(request) => BatchResponse::Single(execute(schema, state.source.clone(), options, request).await),
        BatchRequest::Batch(requests) => {
            tracing::debug!(requests = requests.len(), "graphql batch");
            let mut responses = Vec::with_capacity(requests.len());
            for request in requests {
                responses.push(execute(schema, state.source.clone(), options.clone(), request).await);
            }
            BatchResponse::Batch(responses)
        }
    };
    Ok(response.into())
}

pub fn graphql_routes(state: AppState) -> Router {
    Router::new()
        .route("/graphql", get(graphql).post(graphql))
        .with_state(state)
}
