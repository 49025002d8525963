//! Write hygiene: the document store rejects null-valued fields, so every document is scrubbed
//! before it is written.

use serde_json::Value;

/// Remove null members from objects at every depth and null elements from arrays.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other,
    }
}

/// True when no null survives anywhere in `value`.
pub fn is_clean(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => map.values().all(is_clean),
        Value::Array(items) => items.iter().all(is_clean),
        _ => true,
    }
}
