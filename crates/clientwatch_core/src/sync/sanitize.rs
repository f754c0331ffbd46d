//! Payload cleanup before remote transmission.
//!
//! The document store accepts only literal JSON values for fields it keeps;
//! an absent optional is encoded as `null` by serde and must be dropped
//! rather than sent.

use serde_json::{Map, Value};

/// Recursively removes object members whose value is `null`.
///
/// Array elements are kept in place (their own objects are still cleaned),
/// so positions never shift.
pub fn strip_absent(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(strip_absent_fields(fields)),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_absent).collect()),
        other => other,
    }
}

/// Object-level variant of [`strip_absent`].
pub fn strip_absent_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key, strip_absent(value)))
        .collect()
}
