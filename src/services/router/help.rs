//! Help Text
//!
//! Generated from operation schemas unless the provider supplies its own
//! text through the `ModeHelp` capability.

use serde_json::Value;

use nexus_router_core::{CoreError, CoreResult};
use nexus_router_tools::{CapabilityProvider, Operation};

/// Overview of a provider: one line per mode.
pub fn provider_help(provider: &dyn CapabilityProvider, tool_name: &str) -> String {
    let mut text = format!("{}\n{}\n\nModes:", tool_name, provider.description());
    for operation in provider.operations() {
        text.push_str(&format!("\n  - {}: {}", operation.slug(), operation.description()));
    }
    text.push_str("\n\nCall tools/help with a mode for its parameters.");
    text
}

/// Help for one mode; provider-authored text wins over the generated one.
pub fn mode_help(
    provider: &dyn CapabilityProvider,
    tool_name: &str,
    mode: &str,
) -> CoreResult<String> {
    let operation = provider.operation(mode).ok_or_else(|| {
        CoreError::not_found(format!("Mode '{}' not found in {}", mode, provider.name()))
    })?;

    if let Some(text) = provider.mode_help().and_then(|help| help.help(mode)) {
        return Ok(text);
    }
    Ok(generated_mode_help(operation.as_ref(), tool_name))
}

fn generated_mode_help(operation: &dyn Operation, tool_name: &str) -> String {
    let schema = operation.parameters_schema();
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut text = format!(
        "{} mode \"{}\"\n{}\n\nParameters:\n  - mode (string, required): \"{}\"",
        tool_name,
        operation.slug(),
        operation.description(),
        operation.slug()
    );
    text.push_str("\n  - sessionId (string, required): session id returned by the first call");

    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        for (name, prop) in props {
            if name == "mode" || name == "sessionId" {
                continue;
            }
            let is_required = required.contains(&name.as_str());
            text.push_str(&format!("\n  - {}", describe_parameter(name, prop, is_required)));
        }
    }

    for keyword in ["oneOf", "anyOf"] {
        if let Some(branches) = schema.get(keyword).and_then(Value::as_array) {
            let options: Vec<String> = branches
                .iter()
                .map(|branch| {
                    let fields: Vec<&str> = branch
                        .get("required")
                        .and_then(Value::as_array)
                        .map(|r| r.iter().filter_map(Value::as_str).collect())
                        .unwrap_or_default();
                    format!("[{}]", fields.join(", "))
                })
                .collect();
            text.push_str(&format!("\n\nProvide one of: {}", options.join(" | ")));
        }
    }
    text
}

fn describe_parameter(name: &str, schema: &Value, required: bool) -> String {
    let kind = match schema.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
        _ => "any".to_string(),
    };
    let mut qualifiers = vec![kind, if required { "required" } else { "optional" }.to_string()];
    if let Some(default) = schema.get("default") {
        qualifiers.push(format!("default {}", default));
    }
    let mut line = format!("{} ({})", name, qualifiers.join(", "));
    if let Some(desc) = schema.get("description").and_then(Value::as_str) {
        line.push_str(&format!(": {}", desc));
    }
    if let Some(Value::Array(allowed)) = schema.get("enum") {
        let values: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
        line.push_str(&format!(" [one of {}]", values.join(", ")));
    }
    line
}
