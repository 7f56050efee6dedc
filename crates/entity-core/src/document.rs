//! Document-path field extraction for filter/sort (§9 "Dynamic schemas /
//! duck-typed payloads"). Entity payloads are opaque JSON documents;
//! filter/sort need a way to pull a named field out of either the
//! payload or the entity's own meta-columns.

use std::cmp::Ordering;

use entity_types::{Entity, Filter};
use serde_json::Value;

/// Extracts a field's value, checking meta-columns first (so `id`,
/// `type`, `version`, `createdAt`, `updatedAt` always resolve even though
/// they are not stored inside `payload`), then the payload object.
pub fn field_value(entity: &Entity, field: &str) -> Option<Value> {
    match field {
        "id" => Some(Value::String(entity.id.clone())),
        "type" => Some(Value::String(entity.entity_type.clone())),
        "version" => Some(Value::Number(entity.version.into())),
        "createdAt" | "$createdAt" => Some(Value::String(entity.created_at.to_rfc3339())),
        "updatedAt" | "$updatedAt" => Some(Value::String(entity.updated_at.to_rfc3339())),
        "context" => Some(Value::String(entity.context.clone())),
        _ => match &entity.payload {
            Value::Object(map) => map.get(field).cloned(),
            _ => None,
        },
    }
}

/// Shallow merge of a patch object into a base object — patch keys
/// overwrite base keys, everything else is preserved (used by `update`
/// and verb execution alike to merge a payload into the current state).
pub fn merge(base: &Value, patch: &Value) -> Value {
    let mut merged = match base {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    if let Value::Object(patch_map) = patch {
        for (k, v) in patch_map {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

/// Equality-only filter match, AND-combined across keys. A `null` filter
/// value matches records where the field is absent *or* explicitly null
/// (§4.4).
pub fn matches_filter(entity: &Entity, filter: &Filter) -> bool {
    filter.iter().all(|(field, expected)| {
        let actual = field_value(entity, field);
        match (actual, expected) {
            (None, Value::Null) => true,
            (Some(Value::Null), Value::Null) => true,
            (Some(actual), expected) => &actual == expected,
            (None, _) => false,
        }
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Native-column fast path for `$createdAt`/`$updatedAt`, otherwise
/// falls through to document-path extraction (§4.4).
pub fn compare_by_field(a: &Entity, b: &Entity, field: &str) -> Ordering {
    match field {
        "createdAt" | "$createdAt" => a.created_at.cmp(&b.created_at),
        "updatedAt" | "$updatedAt" => a.updated_at.cmp(&b.updated_at),
        _ => compare_values(field_value(a, field).as_ref(), field_value(b, field).as_ref()),
    }
}
