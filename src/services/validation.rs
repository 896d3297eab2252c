//! Parameter Validation
//!
//! Validates tool-call arguments against a unified provider schema and
//! reports every offending field at once, each with a hint built from the
//! schema (expected type, allowed values, description).
//!
//! Understands the subset of JSON Schema the composer produces: `type`,
//! `enum`, `items`, `required`, `default`, and `allOf` rules of the form
//! `if {mode const} then {required, oneOf/anyOf/allOf}`.

use serde_json::{Map, Value};

use nexus_router_core::{FieldIssue, IssueKind, ValidationError};

/// Batch parameter holding a list of typed operation objects.
const OPERATIONS_KEY: &str = "operations";
/// Batch parameter holding a list of note paths.
const PATHS_KEY: &str = "paths";
const ROOT_FIELD: &str = "(root)";

pub struct ParameterValidator;

impl ParameterValidator {
    /// Validate `params` against `schema`.
    ///
    /// Returns the enriched params (serialized arrays parsed, defaults
    /// filled in) or a `ValidationError` listing every issue found.
    pub fn validate(params: Value, schema: &Value) -> Result<Value, ValidationError> {
        let mut params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ValidationError::new(vec![FieldIssue::new(
                    ROOT_FIELD,
                    IssueKind::TypeMismatch,
                    format!("parameters must be an object, got {}", json_type(&other)),
                    None,
                )]))
            }
        };

        let empty = Map::new();
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        normalize_serialized_arrays(&mut params, properties);

        let mut issues = Vec::new();
        let requirements = active_requirements(schema, &params);

        for field in &requirements.required {
            if !is_present(&params, field) {
                let prop = properties.get(field);
                issues.push(FieldIssue::new(
                    field.clone(),
                    IssueKind::Missing,
                    format!("{} is required", field),
                    prop.and_then(hint_for),
                ));
            }
        }

        for (keyword, branches) in &requirements.alternatives {
            let satisfied = branches
                .iter()
                .any(|branch| branch.iter().all(|f| is_present(&params, f)));
            if !satisfied {
                let options: Vec<String> = branches
                    .iter()
                    .map(|branch| format!("[{}]", branch.join(", ")))
                    .collect();
                issues.push(FieldIssue::new(
                    options.join(" | "),
                    IssueKind::UnmatchedBranch,
                    format!("parameters match none of the {} alternatives", keyword),
                    Some(format!("provide all fields of one of: {}", options.join(" or "))),
                ));
            }
        }

        for (name, value) in &params {
            if value.is_null() {
                continue;
            }
            if let Some(prop) = properties.get(name) {
                check_value(name, value, prop, &mut issues);
            }
        }

        check_batches(&params, properties, &mut issues);

        if !issues.is_empty() {
            tracing::debug!(
                "[ParameterValidator] {} issue(s) in parameters",
                issues.len()
            );
            return Err(ValidationError::new(issues));
        }

        fill_defaults(&mut params, properties);
        Ok(Value::Object(params))
    }
}

// ============================================================================
// Requirements
// ============================================================================

#[derive(Debug, Default)]
struct Requirements {
    required: Vec<String>,
    /// `(keyword, branches)`: at least one branch's fields must all be present
    alternatives: Vec<(String, Vec<Vec<String>>)>,
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn push_unique(into: &mut Vec<String>, fields: Vec<String>) {
    for field in fields {
        if !into.contains(&field) {
            into.push(field);
        }
    }
}

/// Global required fields plus those of every conditional rule whose
/// condition matches `params`.
fn active_requirements(schema: &Value, params: &Map<String, Value>) -> Requirements {
    let mut reqs = Requirements::default();
    push_unique(&mut reqs.required, string_list(schema.get("required")));

    let rules = schema
        .get("allOf")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for rule in rules {
        // Entries without `if` apply unconditionally.
        let then = match (rule.get("if"), rule.get("then")) {
            (Some(condition), Some(then)) if condition_matches(condition, params) => then,
            (Some(_), _) => continue,
            (None, _) => rule,
        };

        push_unique(&mut reqs.required, string_list(then.get("required")));

        if let Some(Value::Array(branches)) = then.get("allOf") {
            for branch in branches {
                push_unique(&mut reqs.required, string_list(branch.get("required")));
            }
        }
        for keyword in ["oneOf", "anyOf"] {
            if let Some(Value::Array(branches)) = then.get(keyword) {
                let sets: Vec<Vec<String>> = branches
                    .iter()
                    .map(|branch| string_list(branch.get("required")))
                    .collect();
                if !sets.is_empty() {
                    reqs.alternatives.push((keyword.to_string(), sets));
                }
            }
        }
    }

    reqs
}

/// Evaluate an `if` clause: every `const` must equal the param value and every
/// listed required field must be present.
fn condition_matches(condition: &Value, params: &Map<String, Value>) -> bool {
    let required_ok = string_list(condition.get("required"))
        .iter()
        .all(|field| is_present(params, field));
    if !required_ok {
        return false;
    }
    condition
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props.iter().all(|(name, rule)| match rule.get("const") {
                Some(expected) => params.get(name) == Some(expected),
                None => true,
            })
        })
        .unwrap_or(true)
}

fn is_present(params: &Map<String, Value>, field: &str) -> bool {
    params.get(field).map(|v| !v.is_null()).unwrap_or(false)
}

// ============================================================================
// Value checks
// ============================================================================

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
            }
            _ => false,
        },
        _ => true,
    }
}

fn declared_types(schema: &Value) -> Vec<String> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.clone()],
        Some(Value::Array(_)) => string_list(schema.get("type")),
        _ => Vec::new(),
    }
}

fn check_value(field: &str, value: &Value, schema: &Value, issues: &mut Vec<FieldIssue>) {
    let types = declared_types(schema);
    if !types.is_empty() && !types.iter().any(|t| matches_type(value, t)) {
        issues.push(FieldIssue::new(
            field,
            IssueKind::TypeMismatch,
            format!("expected {}, got {}", types.join(" or "), json_type(value)),
            hint_for(schema),
        ));
        return;
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            issues.push(FieldIssue::new(
                field,
                IssueKind::InvalidValue,
                format!("{} is not an allowed value", value),
                hint_for(schema),
            ));
            return;
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        let item_types = declared_types(item_schema);
        let primitive = !item_types.is_empty()
            && item_types.iter().all(|t| t != "object" && t != "array");
        if primitive {
            for (index, item) in items.iter().enumerate() {
                check_value(&format!("{}[{}]", field, index), item, item_schema, issues);
            }
        }
    }
}

/// Structural checks for the batch parameters `operations` and `paths`.
fn check_batches(
    params: &Map<String, Value>,
    properties: &Map<String, Value>,
    issues: &mut Vec<FieldIssue>,
) {
    if let Some(value) = params.get(OPERATIONS_KEY).filter(|v| !v.is_null()) {
        let allowed_types = properties
            .get(OPERATIONS_KEY)
            .and_then(|s| s.get("items"))
            .and_then(|s| s.get("properties"))
            .and_then(|s| s.get("type"))
            .map(|s| string_list(s.get("enum")))
            .unwrap_or_default();
        check_operations_batch(value, &allowed_types, issues);
    }

    if let Some(value) = params.get(PATHS_KEY).filter(|v| !v.is_null()) {
        check_paths_batch(value, issues);
    }
}

fn check_operations_batch(value: &Value, allowed_types: &[String], issues: &mut Vec<FieldIssue>) {
    let Some(items) = value.as_array() else {
        // Non-array values were already reported by the type check when the
        // schema declares one.
        if !issues.iter().any(|i| i.field == OPERATIONS_KEY) {
            issues.push(FieldIssue::new(
                OPERATIONS_KEY,
                IssueKind::TypeMismatch,
                format!("expected array, got {}", json_type(value)),
                Some("a list of operation objects, each with a \"type\"".to_string()),
            ));
        }
        return;
    };

    let type_hint = if allowed_types.is_empty() {
        None
    } else {
        Some(format!("type must be one of [{}]", allowed_types.join(", ")))
    };

    for (index, item) in items.iter().enumerate() {
        let field = format!("{}[{}]", OPERATIONS_KEY, index);
        let Some(obj) = item.as_object() else {
            issues.push(FieldIssue::new(
                field,
                IssueKind::InvalidBatchItem,
                format!("batch item must be an object, got {}", json_type(item)),
                type_hint.clone(),
            ));
            continue;
        };
        match obj.get("type").and_then(Value::as_str) {
            None => issues.push(FieldIssue::new(
                format!("{}.type", field),
                IssueKind::InvalidBatchItem,
                "batch item is missing a string \"type\"",
                type_hint.clone(),
            )),
            Some(kind) if !allowed_types.is_empty() && !allowed_types.iter().any(|t| t == kind) => {
                issues.push(FieldIssue::new(
                    format!("{}.type", field),
                    IssueKind::InvalidBatchItem,
                    format!("unknown batch operation type \"{}\"", kind),
                    type_hint.clone(),
                ))
            }
            Some(_) => {}
        }
    }
}

fn check_paths_batch(value: &Value, issues: &mut Vec<FieldIssue>) {
    let Some(items) = value.as_array() else {
        if !issues.iter().any(|i| i.field == PATHS_KEY) {
            issues.push(FieldIssue::new(
                PATHS_KEY,
                IssueKind::TypeMismatch,
                format!("expected array, got {}", json_type(value)),
                Some("a list of path strings".to_string()),
            ));
        }
        return;
    };
    for (index, item) in items.iter().enumerate() {
        let valid = item.as_str().map(|s| !s.trim().is_empty()).unwrap_or(false);
        if !valid {
            let field = format!("{}[{}]", PATHS_KEY, index);
            if issues.iter().any(|i| i.field == field) {
                continue;
            }
            issues.push(FieldIssue::new(
                field,
                IssueKind::InvalidBatchItem,
                format!("path entries must be non-empty strings, got {}", json_type(item)),
                Some("e.g. \"folder/note.md\"".to_string()),
            ));
        }
    }
}

// ============================================================================
// Enrichment
// ============================================================================

/// Parse strings that look like serialized arrays when an array is expected.
fn normalize_serialized_arrays(params: &mut Map<String, Value>, properties: &Map<String, Value>) {
    for (name, value) in params.iter_mut() {
        let Value::String(text) = value else {
            continue;
        };
        let wants_array = name == OPERATIONS_KEY
            || name == PATHS_KEY
            || properties
                .get(name)
                .map(|schema| declared_types(schema).iter().any(|t| t == "array"))
                .unwrap_or(false);
        let trimmed = text.trim();
        if !wants_array || !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(parsed @ Value::Array(_)) => {
                tracing::debug!(
                    "[ParameterValidator] Parsed serialized array for '{}'",
                    name
                );
                *value = parsed;
            }
            _ => {
                tracing::debug!(
                    "[ParameterValidator] '{}' looks like an array but does not parse",
                    name
                );
            }
        }
    }
}

fn fill_defaults(params: &mut Map<String, Value>, properties: &Map<String, Value>) {
    for (name, schema) in properties {
        if let Some(default) = schema.get("default") {
            if !is_present(params, name) {
                params.insert(name.clone(), default.clone());
            }
        }
    }
}

/// Hint for a property: expected type, allowed values, description.
fn hint_for(schema: &Value) -> Option<String> {
    let mut parts = Vec::new();
    let types = declared_types(schema);
    if !types.is_empty() {
        parts.push(format!("expected {}", types.join(" or ")));
    }
    if let Some(Value::Array(allowed)) = schema.get("enum") {
        let values: Vec<String> = allowed
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect();
        parts.push(format!("one of [{}]", values.join(", ")));
    }
    if let Some(desc) = schema.get("description").and_then(Value::as_str) {
        parts.push(desc.to_string());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
