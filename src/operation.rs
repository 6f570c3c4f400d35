//! Mutation primitives and the atomic `Transform` that carries them.

use crate::record::{Identity, Record};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Operation {
    AddRecord {
        record: Record,
    },
    /// Partial update: only attributes and relationships present on `record` are written.
    UpdateRecord {
        record: Record,
    },
    RemoveRecord {
        record: Identity,
    },
    AddToRelatedRecords {
        record: Identity,
        relationship: String,
        related_record: Identity,
    },
    RemoveFromRelatedRecords {
        record: Identity,
        relationship: String,
        related_record: Identity,
    },
    ReplaceRelatedRecords {
        record: Identity,
        relationship: String,
        related_records: Vec<Identity>,
    },
    ReplaceRelatedRecord {
        record: Identity,
        relationship: String,
        related_record: Option<Identity>,
    },
}

impl Operation {
    /// Identity of the record the operation targets.
    pub fn record_identity(&self) -> Identity {
        match self {
            Operation::AddRecord { record } | Operation::UpdateRecord { record } => record.identity(),
            Operation::RemoveRecord { record }
            | Operation::AddToRelatedRecords { record, .. }
            | Operation::RemoveFromRelatedRecords { record, .. }
            | Operation::ReplaceRelatedRecords { record, .. }
            | Operation::ReplaceRelatedRecord { record, .. } => record.clone(),
        }
    }

    pub fn record_type(&self) -> &str {
        match self {
            Operation::AddRecord { record } | Operation::UpdateRecord { record } => &record.type_name,
            Operation::RemoveRecord { record }
            | Operation::AddToRelatedRecords { record, .. }
            | Operation::RemoveFromRelatedRecords { record, .. }
            | Operation::ReplaceRelatedRecords { record, .. }
            | Operation::ReplaceRelatedRecord { record, .. } => &record.type_name,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::AddRecord { .. } => "addRecord",
            Operation::UpdateRecord { .. } => "updateRecord",
            Operation::RemoveRecord { .. } => "removeRecord",
            Operation::AddToRelatedRecords { .. } => "addToRelatedRecords",
            Operation::RemoveFromRelatedRecords { .. } => "removeFromRelatedRecords",
            Operation::ReplaceRelatedRecords { .. } => "replaceRelatedRecords",
            Operation::ReplaceRelatedRecord { .. } => "replaceRelatedRecord",
        }
    }
}

/// An ordered batch of operations applied all-or-nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub id: String,
    pub operations: Vec<Operation>,
}

impl Transform {
    pub fn new(operations: Vec<Operation>) -> Self {
        Transform {
            id: uuid::Uuid::new_v4().to_string(),
            operations,
        }
    }

    pub fn single(operation: Operation) -> Self {
        Transform::new(vec![operation])
    }

    /// Identities created by `addRecord` operations of this transform. Relationship
    /// references to these are valid even when they appear before the create.
    pub fn created_identities(&self) -> Vec<Identity> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::AddRecord { record } => Some(record.identity()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_serialize_tagged() {
        let op = Operation::AddToRelatedRecords {
            record: Identity::new("planet", "earth"),
            relationship: "moons".into(),
            related_record: Identity::new("moon", "luna"),
        };
        let v = serde_json::to_value(&op).unwrap();
        assert_eq!(v["op"], "addToRelatedRecords");
        assert_eq!(v["relatedRecord"]["id"], "luna");
        let back: Operation = serde_json::from_value(v).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn created_identities_lists_adds_only() {
        let t = Transform::new(vec![
            Operation::AddRecord {
                record: Record::new("moon", "m1"),
            },
            Operation::RemoveRecord {
                record: Identity::new("planet", "p1"),
            },
        ]);
        assert_eq!(t.created_identities(), vec![Identity::new("moon", "m1")]);
        assert_eq!(t.operations[1].record_type(), "planet");
    }
}
