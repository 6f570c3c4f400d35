//! Relationship linkage handlers under `/{type}/:id/relationships/{relationship}`.
//!
//! Add and remove apply one operation per identity, each awaited in order: a failure partway
//! leaves the earlier identities applied. Callers needing all-or-nothing use `PATCH /operations`.
//! Replace is a single operation and the source applies it atomically.

use crate::error::AppError;
use crate::handlers::{ParsedRequest, RequestContext};
use crate::operation::{Operation, Transform};
use crate::record::{Identity, Linkage};
use crate::response::HandlerResponse;

fn linkage_targets(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<(Identity, String, Linkage), AppError> {
    let type_name = request.type_name()?;
    let relationship = request.relationship()?;
    let linkage = ctx
        .codec
        .deserialize_linkage_document(type_name, relationship, request.body()?)?;
    Ok((Identity::new(type_name, request.id()?), relationship.to_string(), linkage))
}

fn many(linkage: Linkage) -> Result<Vec<Identity>, AppError> {
    match linkage {
        Linkage::Many(ids) => Ok(ids),
        Linkage::One(_) => Err(AppError::Validation("expected an array of resource identifiers".into())),
    }
}

pub async fn add_to_relationship(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let (record, relationship, linkage) = linkage_targets(ctx, request)?;
    for related_record in many(linkage)? {
        let op = Operation::AddToRelatedRecords {
            record: record.clone(),
            relationship: relationship.clone(),
            related_record,
        };
        ctx.source.update(Transform::single(op), &ctx.options).await?;
    }
    Ok(HandlerResponse::no_content())
}

pub async fn remove_from_relationship(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let (record, relationship, linkage) = linkage_targets(ctx, request)?;
    for related_record in many(linkage)? {
        let op = Operation::RemoveFromRelatedRecords {
            record: record.clone(),
            relationship: relationship.clone(),
            related_record,
        };
        ctx.source.update(Transform::single(op), &ctx.options).await?;
    }
    Ok(HandlerResponse::no_content())
}

pub async fn replace_relationship(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let (record, relationship, linkage) = linkage_targets(ctx, request)?;
    let op = match linkage {
        Linkage::Many(related_records) => Operation::ReplaceRelatedRecords {
            record,
            relationship,
            related_records,
        },
        Linkage::One(related_record) => Operation::ReplaceRelatedRecord {
            record,
            relationship,
            related_record,
        },
    };
    ctx.source.update(Transform::single(op), &ctx.options).await?;
    Ok(HandlerResponse::no_content())
}
