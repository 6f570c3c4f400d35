//! Generic JSON:API handlers.
//!
//! Every handler is an async function of a [`ParsedRequest`] and a [`RequestContext`]; none of them
//! touch axum types, so the same handlers serve any mounting. [`handle`] dispatches by
//! [`HandlerKind`] and, on failure, asks the source to drop queued requests before the error
//! propagates to the translator.

pub mod operations;
pub mod params;
pub mod relationship;
pub mod resource;

use crate::codec::ResourceCodec;
use crate::error::AppError;
use crate::response::HandlerResponse;
use crate::routes::table::HandlerKind;
use crate::source::{RequestOptions, Source};
use serde_json::Value;

pub use params::{parse_include, parse_query_params, QueryParams};

/// Bound source and codec plus per-request source options.
pub struct RequestContext<'a> {
    pub source: &'a dyn Source,
    pub codec: &'a ResourceCodec,
    pub options: RequestOptions,
}

/// Normalized request: bound schema coordinates, path id, raw query pairs and parsed body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedRequest {
    pub type_name: Option<String>,
    pub relationship: Option<String>,
    pub id: Option<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ParsedRequest {
    pub fn type_name(&self) -> Result<&str, AppError> {
        self.type_name
            .as_deref()
            .ok_or_else(|| AppError::Internal("route is not bound to a type".into()))
    }

    pub fn relationship(&self) -> Result<&str, AppError> {
        self.relationship
            .as_deref()
            .ok_or_else(|| AppError::Internal("route is not bound to a relationship".into()))
    }

    pub fn id(&self) -> Result<&str, AppError> {
        self.id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("missing record id".into()))
    }

    pub fn body(&self) -> Result<&Value, AppError> {
        self.body
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("request body is required".into()))
    }
}

pub async fn handle(kind: HandlerKind, ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let result = match kind {
        HandlerKind::FindRecords => resource::find_records(ctx, request).await,
        HandlerKind::FindRecord => resource::find_record(ctx, request).await,
        HandlerKind::CreateRecord => resource::create_record(ctx, request).await,
        HandlerKind::UpdateRecord => resource::update_record(ctx, request).await,
        HandlerKind::RemoveRecord => resource::remove_record(ctx, request).await,
        HandlerKind::FindRelated => resource::find_related(ctx, request).await,
        HandlerKind::AddToRelationship => relationship::add_to_relationship(ctx, request).await,
        HandlerKind::RemoveFromRelationship => relationship::remove_from_relationship(ctx, request).await,
        HandlerKind::ReplaceRelationship => relationship::replace_relationship(ctx, request).await,
        HandlerKind::ApplyOperations => operations::apply_operations(ctx, request).await,
    };
    if result.is_err() {
        clear_pending(ctx.source).await;
    }
    result
}

/// Best-effort cleanup after a failed request; a failure here is logged and swallowed.
pub async fn clear_pending(source: &dyn Source) {
    if let Err(e) = source.clear_pending().await {
        tracing::warn!(error = %e, "failed to clear pending source requests");
    }
}
