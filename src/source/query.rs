//! Query expressions understood by a source, plus the filter/sort evaluation shared by in-process adapters.

use crate::record::{Identity, Record};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOp {
    Equal,
    NotEqual,
    /// `value` must be an array; matches when the attribute equals any element.
    In,
    NotIn,
}

/// Filter on one attribute. The pseudo-attribute `id` filters on the record id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeFilter {
    pub attribute: String,
    pub op: FilterOp,
    pub value: Value,
}

impl AttributeFilter {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        AttributeFilter {
            attribute: attribute.into(),
            op: FilterOp::Equal,
            value: value.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SortSpec {
    pub attribute: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn ascending(attribute: impl Into<String>) -> Self {
        SortSpec {
            attribute: attribute.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(attribute: impl Into<String>) -> Self {
        SortSpec {
            attribute: attribute.into(),
            order: SortOrder::Descending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum QueryExpression {
    FindRecord {
        record: Identity,
    },
    FindRecords {
        #[serde(rename = "type")]
        type_name: String,
        filter: Vec<AttributeFilter>,
        sort: Vec<SortSpec>,
    },
    FindRelatedRecord {
        record: Identity,
        relationship: String,
    },
    FindRelatedRecords {
        record: Identity,
        relationship: String,
    },
}

impl QueryExpression {
    pub fn find_records(type_name: impl Into<String>) -> Self {
        QueryExpression::FindRecords {
            type_name: type_name.into(),
            filter: Vec::new(),
            sort: Vec::new(),
        }
    }
}

/// One or more expressions executed by a single source call. Results come back in the same order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Query {
    pub id: String,
    pub expressions: Vec<QueryExpression>,
}

impl Query {
    pub fn new(expressions: Vec<QueryExpression>) -> Self {
        Query {
            id: uuid::Uuid::new_v4().to_string(),
            expressions,
        }
    }

    pub fn single(expression: QueryExpression) -> Self {
        Query::new(vec![expression])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Record(Option<Record>),
    Records(Vec<Record>),
}

impl QueryResult {
    pub fn into_record(self) -> Option<Record> {
        match self {
            QueryResult::Record(r) => r,
            QueryResult::Records(mut v) => {
                if v.is_empty() {
                    None
                } else {
                    Some(v.remove(0))
                }
            }
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            QueryResult::Record(r) => r.into_iter().collect(),
            QueryResult::Records(v) => v,
        }
    }
}

fn field_value(record: &Record, attribute: &str) -> Value {
    if attribute == "id" {
        return Value::String(record.id.clone());
    }
    record.attributes.get(attribute).cloned().unwrap_or(Value::Null)
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

pub fn record_matches(record: &Record, filter: &AttributeFilter) -> bool {
    let actual = field_value(record, &filter.attribute);
    let in_list = || {
        filter
            .value
            .as_array()
            .map(|list| list.iter().any(|v| values_equal(&actual, v)))
            .unwrap_or(false)
    };
    match filter.op {
        FilterOp::Equal => values_equal(&actual, &filter.value),
        FilterOp::NotEqual => !values_equal(&actual, &filter.value),
        FilterOp::In => in_list(),
        FilterOp::NotIn => !in_list(),
    }
}

/// Nulls sort first; mixed kinds fall back to comparing their JSON text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(n), Value::Number(m)) => n
            .as_f64()
            .partial_cmp(&m.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(s), Value::String(t)) => s.cmp(t),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Compare by each sort key in turn, then by id so the order is total.
pub fn compare_records(a: &Record, b: &Record, sort: &[SortSpec]) -> Ordering {
    for spec in sort {
        let ord = compare_values(&field_value(a, &spec.attribute), &field_value(b, &spec.attribute));
        let ord = match spec.order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}

/// Apply filters (AND) and sort to a record list.
pub fn filter_and_sort(records: impl IntoIterator<Item = Record>, filter: &[AttributeFilter], sort: &[SortSpec]) -> Vec<Record> {
    let mut out: Vec<Record> = records
        .into_iter()
        .filter(|r| filter.iter().all(|f| record_matches(r, f)))
        .collect();
    out.sort_by(|a, b| compare_records(a, b, sort));
    out
}
