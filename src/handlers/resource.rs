//! Record handlers: find-many, find-one, create, update, remove, related records.

use crate::codec::IdPolicy;
use crate::error::{AppError, SourceError};
use crate::handlers::{parse_query_params, ParsedRequest, RequestContext};
use crate::operation::{Operation, Transform};
use crate::record::Identity;
use crate::response::HandlerResponse;
use crate::source::{query_one, QueryExpression};

pub async fn find_records(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let type_name = request.type_name()?;
    let params = parse_query_params(ctx.codec, type_name, &request.query);
    let expression = QueryExpression::FindRecords {
        type_name: type_name.to_string(),
        filter: params.filter,
        sort: params.sort,
    };
    let records = query_one(ctx.source, expression, &ctx.options).await?.into_records();
    Ok(HandlerResponse::ok(ctx.codec.serialize_many(&records)))
}

pub async fn find_record(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let identity = Identity::new(request.type_name()?, request.id()?);
    let record = query_one(ctx.source, QueryExpression::FindRecord { record: identity.clone() }, &ctx.options)
        .await?
        .into_record()
        .ok_or_else(|| SourceError::RecordNotFound(identity))?;
    Ok(HandlerResponse::ok(ctx.codec.serialize_one(Some(&record))))
}

/// 201 with `Location: /{plural}/{id}` and the stored record, including a generated id.
pub async fn create_record(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let type_name = request.type_name()?;
    let record = ctx
        .codec
        .deserialize_document(request.body()?, type_name, IdPolicy::Generate)?;
    let identity = record.identity();
    let mut results = ctx
        .source
        .update(Transform::single(Operation::AddRecord { record }), &ctx.options)
        .await?;
    let created = results
        .pop()
        .flatten()
        .ok_or_else(|| AppError::Internal(format!("source returned no record for {}", identity)))?;
    let location = format!("/{}/{}", ctx.codec.resource_type(type_name), created.id);
    Ok(HandlerResponse::created(location, ctx.codec.serialize_one(Some(&created))))
}

pub async fn update_record(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let type_name = request.type_name()?;
    let id = request.id()?;
    let record = ctx
        .codec
        .deserialize_document(request.body()?, type_name, IdPolicy::Path(id))?;
    ctx.source
        .update(Transform::single(Operation::UpdateRecord { record }), &ctx.options)
        .await?;
    Ok(HandlerResponse::no_content())
}

pub async fn remove_record(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let record = Identity::new(request.type_name()?, request.id()?);
    ctx.source
        .update(Transform::single(Operation::RemoveRecord { record }), &ctx.options)
        .await?;
    Ok(HandlerResponse::no_content())
}

/// hasOne relationships answer with a single resource or `null`, hasMany with an array.
pub async fn find_related(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let type_name = request.type_name()?;
    let relationship = request.relationship()?;
    let record = Identity::new(type_name, request.id()?);
    let def = ctx
        .codec
        .schema()
        .relationship(type_name, relationship)
        .ok_or_else(|| AppError::NotFound(format!("relationship {}.{}", type_name, relationship)))?;
    let relationship = relationship.to_string();
    if def.is_many() {
        let records = query_one(ctx.source, QueryExpression::FindRelatedRecords { record, relationship }, &ctx.options)
            .await?
            .into_records();
        Ok(HandlerResponse::ok(ctx.codec.serialize_many(&records)))
    } else {
        let related = query_one(ctx.source, QueryExpression::FindRelatedRecord { record, relationship }, &ctx.options)
            .await?
            .into_record();
        Ok(HandlerResponse::ok(ctx.codec.serialize_one(related.as_ref())))
    }
}
