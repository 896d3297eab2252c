//! Schema Composer
//!
//! Builds one unified parameter schema per provider. The discriminant `mode`
//! selects the operation; every operation's required fields become a
//! conditional rule keyed on its slug instead of being globally required.
//!
//! Output shape:
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": { "mode": {"type": "string", "enum": [...]}, "sessionId": {...}, ... },
//!   "required": ["mode", "sessionId"],
//!   "allOf": [
//!     { "if": {"properties": {"mode": {"const": "createContent"}}, "required": ["mode"]},
//!       "then": {"required": ["filePath", "content"]} }
//!   ]
//! }
//! ```

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use nexus_router_tools::CapabilityProvider;

use super::sanitize::sanitize_property;
use crate::models::{CollisionPolicy, SchemaSettings, UnionPolicy};

pub const MODE_KEY: &str = "mode";
pub const SESSION_ID_KEY: &str = "sessionId";

const UNION_KEYWORDS: [&str; 3] = ["oneOf", "anyOf", "allOf"];

/// Composes unified provider schemas under the configured policies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaComposer {
    union_policy: UnionPolicy,
    collision_policy: CollisionPolicy,
}

/// The parts of an operation schema the composer uses.
#[derive(Debug, Default)]
struct OperationShape {
    properties: Map<String, Value>,
    required: Vec<String>,
    /// `(keyword, branches)` for each union keyword present
    unions: Vec<(&'static str, Vec<Map<String, Value>>)>,
}

impl SchemaComposer {
    pub fn new(settings: SchemaSettings) -> Self {
        Self {
            union_policy: settings.union_policy,
            collision_policy: settings.collision_policy,
        }
    }

    pub fn union_policy(&self) -> UnionPolicy {
        self.union_policy
    }

    /// Compose the unified schema for `provider`.
    pub fn compose(&self, provider: &dyn CapabilityProvider) -> Value {
        let mut modes: Vec<Value> = Vec::new();
        let mut properties = Map::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut conditionals: Vec<Value> = Vec::new();

        for operation in provider.operations() {
            let slug = operation.slug().to_string();
            let slug_value = Value::String(slug.clone());
            if modes.contains(&slug_value) {
                tracing::warn!(
                    "[SchemaComposer] Duplicate mode '{}' in provider '{}'",
                    slug,
                    provider.name()
                );
            } else {
                modes.push(slug_value);
            }

            let shape = match parse_operation_schema(&operation.parameters_schema()) {
                Ok(shape) => shape,
                Err(reason) => {
                    tracing::warn!(
                        "[SchemaComposer] Skipping schema of {}.{}: {}",
                        provider.name(),
                        slug,
                        reason
                    );
                    continue;
                }
            };

            if let Some(rule) = self.merge_operation(&slug, shape, &mut properties, &mut owners) {
                conditionals.push(rule);
            }
        }

        let mode_count = modes.len();
        let mut unified = Map::new();
        unified.insert("type".to_string(), json!("object"));
        let mut all_properties = Map::new();
        all_properties.insert(
            MODE_KEY.to_string(),
            json!({
                "type": "string",
                "enum": modes,
                "description": "Operation to perform"
            }),
        );
        all_properties.insert(
            SESSION_ID_KEY.to_string(),
            json!({
                "type": "string",
                "description": "Session identifier. Reuse the id returned by the first call."
            }),
        );
        all_properties.extend(properties);
        unified.insert("properties".to_string(), Value::Object(all_properties));
        unified.insert("required".to_string(), json!([MODE_KEY, SESSION_ID_KEY]));
        if !conditionals.is_empty() {
            unified.insert("allOf".to_string(), Value::Array(conditionals));
        }

        tracing::debug!(
            "[SchemaComposer] Composed schema for '{}' with {} modes",
            provider.name(),
            mode_count
        );
        Value::Object(unified)
    }

    /// Merge one operation's properties and return its conditional rule, if
    /// the operation requires anything.
    fn merge_operation(
        &self,
        slug: &str,
        shape: OperationShape,
        properties: &mut Map<String, Value>,
        owners: &mut HashMap<String, String>,
    ) -> Option<Value> {
        let flatten = self.union_policy == UnionPolicy::Flatten;

        for (name, schema) in shape.properties {
            self.merge_property(slug, name, schema, properties, owners);
        }

        let mut required = shape.required;
        let mut preserved: Vec<(&str, Value)> = Vec::new();

        for (keyword, branches) in shape.unions {
            for branch in &branches {
                if let Some(props) = branch.get("properties").and_then(Value::as_object) {
                    for (name, schema) in props {
                        if is_reserved(name) {
                            continue;
                        }
                        self.merge_property(slug, name.clone(), schema.clone(), properties, owners);
                    }
                }
            }

            if flatten {
                let extra = if keyword == "allOf" {
                    branches.iter().flat_map(branch_required).collect()
                } else {
                    most_permissive(&branches)
                };
                for field in extra {
                    if !required.contains(&field) {
                        required.push(field);
                    }
                }
            } else {
                let kept: Vec<Value> = branches
                    .iter()
                    .map(|branch| json!({ "required": branch_required(branch) }))
                    .collect();
                preserved.push((keyword, Value::Array(kept)));
            }
        }

        if required.is_empty() && preserved.is_empty() {
            return None;
        }

        let mut then = Map::new();
        if !required.is_empty() {
            then.insert("required".to_string(), json!(required));
        }
        for (keyword, branches) in preserved {
            then.insert(keyword.to_string(), branches);
        }

        Some(json!({
            "if": {
                "properties": { MODE_KEY: { "const": slug } },
                "required": [MODE_KEY]
            },
            "then": then
        }))
    }

    fn merge_property(
        &self,
        slug: &str,
        name: String,
        mut schema: Value,
        properties: &mut Map<String, Value>,
        owners: &mut HashMap<String, String>,
    ) {
        if self.union_policy == UnionPolicy::Flatten {
            sanitize_property(&mut schema);
        }

        let Some(existing) = properties.get(&name) else {
            owners.insert(name.clone(), slug.to_string());
            properties.insert(name, schema);
            return;
        };

        let previous_owner = owners.get(&name).cloned().unwrap_or_default();
        if existing.get("type") != schema.get("type") {
            tracing::warn!(
                "[SchemaComposer] Property '{}' declared as {} by '{}' and {} by '{}' ({:?})",
                name,
                type_label(existing),
                previous_owner,
                type_label(&schema),
                slug,
                self.collision_policy
            );
        }

        if self.collision_policy == CollisionPolicy::LastWins {
            owners.insert(name.clone(), slug.to_string());
            properties.insert(name, schema);
        }
    }
}

fn is_reserved(name: &str) -> bool {
    name == MODE_KEY || name == SESSION_ID_KEY
}

fn type_label(schema: &Value) -> String {
    schema
        .get("type")
        .map(|t| t.to_string())
        .unwrap_or_else(|| "untyped".to_string())
}

fn branch_required(branch: &Map<String, Value>) -> Vec<String> {
    branch
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .filter(|f| !is_reserved(f))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Required fields of the branch asking the least of the caller. Ties go to
/// the earliest branch.
fn most_permissive(branches: &[Map<String, Value>]) -> Vec<String> {
    branches
        .iter()
        .map(branch_required)
        .enumerate()
        .min_by_key(|(index, required)| (required.len(), *index))
        .map(|(_, required)| required)
        .unwrap_or_default()
}

/// Check an operation schema's structure and pull out what composition needs.
fn parse_operation_schema(schema: &Value) -> Result<OperationShape, String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| format!("schema must be an object, got {}", kind_of(schema)))?;

    if let Some(t) = obj.get("type") {
        if t != "object" {
            return Err(format!("schema type must be \"object\", got {}", t));
        }
    }

    let mut shape = OperationShape::default();

    match obj.get("properties") {
        None => {}
        Some(Value::Object(props)) => {
            for (name, prop) in props {
                if !is_reserved(name) {
                    shape.properties.insert(name.clone(), prop.clone());
                }
            }
        }
        Some(other) => return Err(format!("properties must be an object, got {}", kind_of(other))),
    }

    if let Some(required) = obj.get("required") {
        let fields = required
            .as_array()
            .ok_or_else(|| "required must be a list".to_string())?;
        for field in fields {
            let name = field
                .as_str()
                .ok_or_else(|| format!("required entries must be strings, got {}", field))?;
            if !is_reserved(name) && !shape.required.iter().any(|f| f == name) {
                shape.required.push(name.to_string());
            }
        }
    }

    for keyword in UNION_KEYWORDS {
        let Some(value) = obj.get(keyword) else {
            continue;
        };
        let entries = value
            .as_array()
            .ok_or_else(|| format!("{} must be a list", keyword))?;
        let branches = entries
            .iter()
            .map(|entry| {
                entry
                    .as_object()
                    .cloned()
                    .ok_or_else(|| format!("{} entries must be objects", keyword))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !branches.is_empty() {
            shape.unions.push((keyword, branches));
        }
    }

    Ok(shape)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
