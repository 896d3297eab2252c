//! Property Schema Sanitization
//!
//! Used by the compatibility-hardened union policy. Reduces each property
//! schema to the subset strict clients understand: no references, no
//! annotations, no conditionals, no nested unions.

use serde_json::{Map, Value};

const UNSUPPORTED_KEYS: [&str; 15] = [
    "$schema",
    "$ref",
    "$id",
    "$defs",
    "definitions",
    "$comment",
    "examples",
    "readOnly",
    "writeOnly",
    "deprecated",
    "contentMediaType",
    "contentEncoding",
    "if",
    "then",
    "else",
];

/// Sanitize one property schema in place, recursing into nested schemas.
///
/// - drops the keys in `UNSUPPORTED_KEYS`
/// - merges `allOf` entries into the parent (existing keys win)
/// - collapses `anyOf`/`oneOf`: a single branch is merged into the parent;
///   several branches become a type list when every branch names a type,
///   plus a "One of: ..." description
pub fn sanitize_property(schema: &mut Value) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };

    for key in UNSUPPORTED_KEYS {
        obj.remove(key);
    }

    if let Some(Value::Array(entries)) = obj.remove("allOf") {
        for entry in entries.iter().filter_map(Value::as_object) {
            merge_missing(obj, entry);
        }
    }

    for keyword in ["anyOf", "oneOf"] {
        let Some(Value::Array(branches)) = obj.remove(keyword) else {
            continue;
        };
        collapse_branches(obj, &branches);
    }

    if let Some(Value::Object(props)) = obj.get_mut("properties") {
        for prop in props.values_mut() {
            sanitize_property(prop);
        }
    }
    if let Some(items) = obj.get_mut("items") {
        sanitize_property(items);
    }
    if let Some(additional) = obj.get_mut("additionalProperties") {
        if additional.is_object() {
            sanitize_property(additional);
        }
    }
}

/// Copy keys from `from` that `into` does not define yet. `properties` maps
/// are merged key by key and `required` lists are unioned.
fn merge_missing(into: &mut Map<String, Value>, from: &Map<String, Value>) {
    for (key, value) in from {
        match (key.as_str(), into.get_mut(key)) {
            ("properties", Some(Value::Object(existing))) => {
                if let Some(incoming) = value.as_object() {
                    for (name, prop) in incoming {
                        existing.entry(name.clone()).or_insert_with(|| prop.clone());
                    }
                }
            }
            ("required", Some(Value::Array(existing))) => {
                if let Some(incoming) = value.as_array() {
                    for field in incoming {
                        if !existing.contains(field) {
                            existing.push(field.clone());
                        }
                    }
                }
            }
            (_, Some(_)) => {}
            (_, None) => {
                into.insert(key.clone(), value.clone());
            }
        }
    }
}

fn collapse_branches(obj: &mut Map<String, Value>, branches: &[Value]) {
    if branches.len() == 1 {
        if let Some(inner) = branches[0].as_object() {
            merge_missing(obj, inner);
        }
        return;
    }

    let mut types: Vec<Value> = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    let mut all_typed = true;
    for branch in branches {
        match branch.get("type").and_then(Value::as_str) {
            Some(t) => {
                labels.push(t.to_string());
                let t = Value::String(t.to_string());
                if !types.contains(&t) {
                    types.push(t);
                }
            }
            None => {
                all_typed = false;
                if let Some(desc) = branch.get("description").and_then(Value::as_str) {
                    labels.push(desc.to_string());
                }
            }
        }
    }

    if !labels.is_empty() && !obj.contains_key("description") {
        obj.insert(
            "description".to_string(),
            Value::String(format!("One of: {}", labels.join(", "))),
        );
    }
    if all_typed && !types.is_empty() && !obj.contains_key("type") {
        let value = if types.len() == 1 {
            types.remove(0)
        } else {
            Value::Array(types)
        };
        obj.insert("type".to_string(), value);
    }
}
