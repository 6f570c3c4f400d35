//! Attribute value checks against declared kinds, and query-string coercion.

use crate::error::AppError;
use crate::schema::AttributeKind;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Check one attribute value against its declared kind. `null` is always accepted;
/// kinds the server does not know are passed through unchecked.
pub fn check_attribute(type_name: &str, attribute: &str, kind: &AttributeKind, value: &Value) -> Result<(), AppError> {
    if value.is_null() {
        return Ok(());
    }
    let ok = match kind {
        AttributeKind::String => value.is_string(),
        AttributeKind::Number => value.is_number(),
        AttributeKind::Boolean => value.is_boolean(),
        AttributeKind::Date => value
            .as_str()
            .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
            .unwrap_or(false),
        AttributeKind::DateTime => value
            .as_str()
            .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
            .unwrap_or(false),
        AttributeKind::Other(_) => true,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{}.{} must be a {}",
            type_name,
            attribute,
            kind.as_str()
        )))
    }
}

/// Coerce a raw query-string value to the attribute's kind. Values that do not parse stay strings,
/// so a filter on a number attribute with a non-numeric value simply matches nothing.
pub fn coerce_query_value(kind: Option<&AttributeKind>, raw: &str) -> Value {
    match kind {
        Some(AttributeKind::Number) => {
            if let Ok(n) = raw.parse::<i64>() {
                return Value::Number(n.into());
            }
            if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
        }
        Some(AttributeKind::Boolean) => {
            if raw.eq_ignore_ascii_case("true") {
                return Value::Bool(true);
            }
            if raw.eq_ignore_ascii_case("false") {
                return Value::Bool(false);
            }
        }
        _ => {}
    }
    Value::String(raw.to_string())
}
