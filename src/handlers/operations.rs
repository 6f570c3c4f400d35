//! `PATCH /operations`: an ordered list of heterogeneous operations applied as one transform.
//!
//! Request: `{operations: [{op: "add"|"update"|"remove", ref: {type, id?, relationship?}, data?}]}`.
//! Response: `{operations: [{data}]}` in request order. Removals answer with the removed identity.
//! Adds without an id get one generated before submission so later operations can reference it.

use crate::codec::IdPolicy;
use crate::error::AppError;
use crate::handlers::{ParsedRequest, RequestContext};
use crate::operation::{Operation, Transform};
use crate::record::{Identity, Linkage};
use crate::response::HandlerResponse;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct OperationsDocument {
    operations: Vec<OperationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OpCode {
    Add,
    Update,
    Remove,
}

#[derive(Debug, Deserialize)]
struct OperationRef {
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    relationship: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationEntry {
    op: OpCode,
    #[serde(rename = "ref")]
    target: OperationRef,
    #[serde(default)]
    data: Option<Value>,
}

/// Transform operations produced by one request entry. Relationship adds and removes with several
/// identifiers expand to several operations; the entry's result is the record after the last one.
struct Expanded {
    operations: Vec<Operation>,
    removed: Option<Identity>,
}

pub async fn apply_operations(ctx: &RequestContext<'_>, request: &ParsedRequest) -> Result<HandlerResponse, AppError> {
    let document: OperationsDocument = serde_json::from_value(request.body()?.clone())
        .map_err(|e| AppError::Validation(format!("invalid operations document: {}", e)))?;

    let mut operations = Vec::new();
    let mut ends = Vec::with_capacity(document.operations.len());
    let mut removed = Vec::with_capacity(document.operations.len());
    for (index, entry) in document.operations.iter().enumerate() {
        let expanded = expand(ctx, entry).map_err(|e| match e {
            AppError::Validation(m) => AppError::Validation(format!("operation {}: {}", index, m)),
            other => other,
        })?;
        if expanded.operations.is_empty() {
            return Err(AppError::Validation(format!("operation {} has no effect", index)));
        }
        operations.extend(expanded.operations);
        ends.push(operations.len() - 1);
        removed.push(expanded.removed);
    }

    let transform = Transform::new(operations);
    tracing::debug!(
        transform = %transform.id,
        entries = ends.len(),
        operations = transform.operations.len(),
        "applying batch"
    );
    let results = ctx.source.update(transform, &ctx.options).await?;

    let mut out = Vec::with_capacity(ends.len());
    for (end, removed) in ends.into_iter().zip(removed) {
        let data = match removed {
            Some(identity) => ctx.codec.resource_identity(&identity),
            None => results
                .get(end)
                .and_then(Option::as_ref)
                .map(|r| ctx.codec.serialize_record(r))
                .unwrap_or(Value::Null),
        };
        out.push(json!({ "data": data }));
    }
    Ok(HandlerResponse::ok(json!({ "operations": out })))
}

/// Resolve a `ref.type`, accepting the wire resource type or the model type.
fn resolve_type(ctx: &RequestContext<'_>, resource_type: &str) -> Result<String, AppError> {
    if let Some(type_name) = ctx.codec.record_type(resource_type) {
        return Ok(type_name.to_string());
    }
    if ctx.codec.schema().has_model(resource_type) {
        return Ok(resource_type.to_string());
    }
    Err(AppError::Validation(format!("unknown resource type '{}'", resource_type)))
}

fn expand(ctx: &RequestContext<'_>, entry: &OperationEntry) -> Result<Expanded, AppError> {
    let type_name = resolve_type(ctx, &entry.target.resource_type)?;
    let data = || {
        entry
            .data
            .as_ref()
            .ok_or_else(|| AppError::Validation("'data' is required".into()))
    };
    let ref_id = || {
        entry
            .target
            .id
            .as_deref()
            .ok_or_else(|| AppError::Validation("'ref.id' is required".into()))
    };

    let Some(wire_relationship) = entry.target.relationship.as_deref() else {
        let (operation, removed) = match entry.op {
            OpCode::Add => {
                let record = ctx.codec.deserialize_resource(data()?, &type_name, IdPolicy::Generate)?;
                (Operation::AddRecord { record }, None)
            }
            OpCode::Update => {
                let policy = match entry.target.id.as_deref() {
                    Some(id) => IdPolicy::Path(id),
                    None => IdPolicy::Require,
                };
                let record = ctx.codec.deserialize_resource(data()?, &type_name, policy)?;
                (Operation::UpdateRecord { record }, None)
            }
            OpCode::Remove => {
                let identity = Identity::new(type_name.clone(), ref_id()?);
                (Operation::RemoveRecord { record: identity.clone() }, Some(identity))
            }
        };
        return Ok(Expanded {
            operations: vec![operation],
            removed,
        });
    };

    let relationship = ctx
        .codec
        .record_relationship(&type_name, wire_relationship)
        .or_else(|| {
            ctx.codec
                .schema()
                .relationship(&type_name, wire_relationship)
                .map(|_| wire_relationship.to_string())
        })
        .ok_or_else(|| {
            AppError::Validation(format!("unknown relationship {}.{}", type_name, wire_relationship))
        })?;
    let def = ctx
        .codec
        .schema()
        .relationship(&type_name, &relationship)
        .ok_or_else(|| AppError::Internal(format!("relationship {}.{} vanished", type_name, relationship)))?;
    let record = Identity::new(type_name.clone(), ref_id()?);
    let data = data()?;

    let operations = match entry.op {
        OpCode::Update => match ctx.codec.deserialize_linkage(&type_name, &relationship, def, data)? {
            Linkage::Many(related_records) => vec![Operation::ReplaceRelatedRecords {
                record,
                relationship,
                related_records,
            }],
            Linkage::One(related_record) => vec![Operation::ReplaceRelatedRecord {
                record,
                relationship,
                related_record,
            }],
        },
        OpCode::Add | OpCode::Remove => {
            if !def.is_many() {
                return Err(AppError::Validation(format!(
                    "{}.{} is hasOne; use 'update' to replace it",
                    type_name, relationship
                )));
            }
            // A single identifier is accepted as shorthand for a one-element list.
            let items = match data {
                Value::Array(_) => data.clone(),
                other => Value::Array(vec![other.clone()]),
            };
            let related = match ctx.codec.deserialize_linkage(&type_name, &relationship, def, &items)? {
                Linkage::Many(ids) => ids,
                Linkage::One(id) => id.into_iter().collect(),
            };
            related
                .into_iter()
                .map(|related_record| match entry.op {
                    OpCode::Add => Operation::AddToRelatedRecords {
                        record: record.clone(),
                        relationship: relationship.clone(),
                        related_record,
                    },
                    _ => Operation::RemoveFromRelatedRecords {
                        record: record.clone(),
                        relationship: relationship.clone(),
                        related_record,
                    },
                })
                .collect()
        }
    };
    Ok(Expanded {
        operations,
        removed: None,
    })
}
