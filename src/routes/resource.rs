//! Mounts the generated route table on an axum router.
//!
//! Every path of the table is mounted once; each method on it is a closure bound to the
//! route's handler kind and schema coordinates. Methods missing from a mounted path answer 405,
//! paths missing from the table answer 404.

use crate::error::AppError;
use crate::extractors::ForwardedHeaders;
use crate::handlers::{clear_pending, handle, parse_include, ParsedRequest, RequestContext};
use crate::response::HandlerResponse;
use crate::routes::table::{BoundParams, HandlerKind, RouteDefinition};
use crate::source::RequestOptions;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::Method,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;

fn method_filter(method: &Method) -> Option<MethodFilter> {
    match *method {
        Method::GET => Some(MethodFilter::GET),
        Method::POST => Some(MethodFilter::POST),
        Method::PATCH => Some(MethodFilter::PATCH),
        Method::PUT => Some(MethodFilter::PUT),
        Method::DELETE => Some(MethodFilter::DELETE),
        _ => None,
    }
}

fn parse_body(body: &Bytes) -> Result<Option<Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("request body is not valid JSON: {}", e)))
}

async fn dispatch(
    state: AppState,
    kind: HandlerKind,
    bound: BoundParams,
    params: HashMap<String, String>,
    query: Vec<(String, String)>,
    headers: ForwardedHeaders,
    body: Bytes,
) -> Result<HandlerResponse, AppError> {
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => {
            clear_pending(state.source.as_ref()).await;
            return Err(e);
        }
    };
    let request = ParsedRequest {
        type_name: bound.type_name,
        relationship: bound.relationship,
        id: params.get("id").cloned(),
        body,
        query,
    };
    let ctx = RequestContext {
        source: state.source.as_ref(),
        codec: state.codec.as_ref(),
        options: RequestOptions {
            include: parse_include(&request.query),
            headers: headers.into_inner(),
        },
    };
    tracing::debug!(handler = ?kind, type_name = ?request.type_name, id = ?request.id, "jsonapi request");
    handle(kind, &ctx, &request).await
}

fn method_route(route: &RouteDefinition) -> Option<MethodRouter<AppState>> {
    let filter = method_filter(&route.method)?;
    let kind = route.handler;
    let bound = route.bound.clone();
    let handler = move |State(state): State<AppState>,
                        params: Option<Path<HashMap<String, String>>>,
                        Query(query): Query<Vec<(String, String)>>,
                        headers: ForwardedHeaders,
                        body: Bytes| {
        let bound = bound.clone();
        async move {
            let params = params.map(|Path(p)| p).unwrap_or_default();
            dispatch(state, kind, bound, params, query, headers, body).await
        }
    };
    Some(on(filter, handler))
}

/// JSON:API routes generated for every model of the schema.
pub fn jsonapi_routes(state: AppState) -> Router {
    let table = state.routes.clone();
    let mut router = Router::new();
    for (path, routes) in table.by_path() {
        let mut methods: Option<MethodRouter<AppState>> = None;
        for route in routes {
            let Some(method) = method_route(route) else {
                tracing::warn!(route = %route, "skipping route with unsupported method");
                continue;
            };
            methods = Some(match methods {
                Some(existing) => existing.merge(method),
                None => method,
            });
        }
        if let Some(methods) = methods {
            router = router.route(path, methods);
        }
    }
    for line in table.describe() {
        tracing::debug!(route = %line, "mounted");
    }
    router.with_state(state)
}
