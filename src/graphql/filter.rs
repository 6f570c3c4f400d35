//! `where` and `orderBy` arguments of the plural root fields.
//!
//! `{Type}WhereInput` carries four operators per attribute (and `id`): `name`, `name_not`,
//! `name_in`, `name_not_in`. `{Type}OrderByInput` items are `{attribute}_ASC` / `{attribute}_DESC`.

use crate::schema::Schema;
use crate::source::{AttributeFilter, FilterOp, SortSpec};
use serde_json::Value;

const SUFFIXES: [(&str, FilterOp); 3] = [
    ("_not_in", FilterOp::NotIn),
    ("_in", FilterOp::In),
    ("_not", FilterOp::NotEqual),
];

pub fn where_input_name(object_name: &str) -> String {
    format!("{}WhereInput", object_name)
}

pub fn order_by_name(object_name: &str) -> String {
    format!("{}OrderByInput", object_name)
}

fn is_field(schema: &Schema, type_name: &str, name: &str) -> bool {
    name == "id" || schema.attribute(type_name, name).is_some()
}

/// Split a where-input key into attribute and operator.
pub fn parse_where_key(key: &str) -> (&str, FilterOp) {
    for (suffix, op) in SUFFIXES {
        if let Some(attribute) = key.strip_suffix(suffix) {
            if !attribute.is_empty() {
                return (attribute, op);
            }
        }
    }
    (key, FilterOp::Equal)
}

/// Translate a `where` object into AND-combined filters.
pub fn where_filters(schema: &Schema, type_name: &str, input: &Value) -> Result<Vec<AttributeFilter>, String> {
    let object = match input {
        Value::Null => return Ok(Vec::new()),
        Value::Object(o) => o,
        other => return Err(format!("'where' must be an object, got {}", other)),
    };
    let mut filters = Vec::with_capacity(object.len());
    for (key, value) in object {
        let (mut attribute, mut op) = parse_where_key(key);
        // An attribute whose own name ends in a suffix wins over the operator reading.
        if !is_field(schema, type_name, attribute) && is_field(schema, type_name, key) {
            attribute = key.as_str();
            op = FilterOp::Equal;
        }
        if !is_field(schema, type_name, attribute) {
            return Err(format!("unknown where field '{}'", key));
        }
        if matches!(op, FilterOp::In | FilterOp::NotIn) && !value.is_array() {
            return Err(format!("'{}' expects a list", key));
        }
        filters.push(AttributeFilter {
            attribute: attribute.to_string(),
            op,
            value: value.clone(),
        });
    }
    Ok(filters)
}

/// Translate `orderBy` enum item names into sort keys, in order.
pub fn order_by<'a>(schema: &Schema, type_name: &str, items: impl IntoIterator<Item = &'a str>) -> Result<Vec<SortSpec>, String> {
    items
        .into_iter()
        .map(|item| {
            let spec = match item.rsplit_once('_') {
                Some((attribute, "ASC")) => SortSpec::ascending(attribute),
                Some((attribute, "DESC")) => SortSpec::descending(attribute),
                _ => return Err(format!("invalid orderBy value '{}'", item)),
            };
            if is_field(schema, type_name, &spec.attribute) {
                Ok(spec)
            } else {
                Err(format!("unknown orderBy field in '{}'", item))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeKind, ModelDefinition};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_models([(
            "planet",
            ModelDefinition::new()
                .attribute("name", AttributeKind::String)
                .attribute("mass", AttributeKind::Number),
        )])
        .unwrap()
    }

    #[test]
    fn splits_operator_suffixes() {
        assert_eq!(parse_where_key("name_not_in"), ("name", FilterOp::NotIn));
        assert_eq!(parse_where_key("name_in"), ("name", FilterOp::In));
        assert_eq!(parse_where_key("name_not"), ("name", FilterOp::NotEqual));
        assert_eq!(parse_where_key("name"), ("name", FilterOp::Equal));
        assert_eq!(parse_where_key("_in"), ("_in", FilterOp::Equal));
    }

    #[test]
    fn builds_filters() {
        let filters = where_filters(&schema(), "planet", &json!({"name_in": ["Earth", "Mars"], "mass": 5, "id_not": "x"})).unwrap();
        assert_eq!(filters.len(), 3);
        assert!(filters.iter().any(|f| f.attribute == "mass" && f.op == FilterOp::Equal));
        assert!(filters.iter().any(|f| f.attribute == "id" && f.op == FilterOp::NotEqual));
        assert!(where_filters(&schema(), "planet", &json!({"color": "red"})).is_err());
        assert!(where_filters(&schema(), "planet", &json!({"name_in": "Earth"})).is_err());
        assert!(where_filters(&schema(), "planet", &Value::Null).unwrap().is_empty());
    }

    #[test]
    fn parses_order_by() {
        let sort = order_by(&schema(), "planet", ["mass_DESC", "id_ASC"]).unwrap();
        assert_eq!(sort, vec![SortSpec::descending("mass"), SortSpec::ascending("id")]);
        assert!(order_by(&schema(), "planet", ["mass"]).is_err());
        assert!(order_by(&schema(), "planet", ["color_ASC"]).is_err());
    }
}
