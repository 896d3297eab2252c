//! Shared providers and helpers for the router integration tests.

use std::sync::Arc;

use nexus_router_core::{CoreResult, ExecutionContext, OperationContext};
use serde_json::{json, Map, Value};

use nexus_router::{
    CapabilityProvider, CoreError, FunctionOperation, Handoff, HandoffDirective, ModeHelp,
    Operation, OperationResult, Router, RouterConfig, StaticProvider, ToolCallResponse,
    WorkspaceContext,
};

pub const SESSION: &str = "s-20250101120000";

fn operation<F>(slug: &str, description: &str, schema: Value, handler: F) -> Arc<dyn Operation>
where
    F: Fn(
            &OperationContext,
            Value,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = CoreResult<OperationResult>> + Send + '_>,
        > + Send
        + Sync
        + 'static,
{
    Arc::new(FunctionOperation::new(slug, description, schema, handler))
}

struct ContentHelp;

impl ModeHelp for ContentHelp {
    fn help(&self, slug: &str) -> Option<String> {
        (slug == "createContent").then(|| "Creates a note. Overwrites nothing.".to_string())
    }
}

/// `contentManager`: note operations that echo what they receive.
pub fn content_manager() -> Arc<dyn CapabilityProvider> {
    Arc::new(
        StaticProvider::new("contentManager", "Read and write notes")
            .with_operation(operation(
                "readContent",
                "Read a note",
                json!({
                    "type": "object",
                    "properties": {
                        "filePath": {"type": "string", "description": "Path of the note"},
                        "workspaceId": {"type": "string"}
                    },
                    "required": ["filePath"]
                }),
                |ctx, params| {
                    let session = ctx.session_id().to_string();
                    Box::pin(async move {
                        Ok(OperationResult::ok(json!({
                            "filePath": params["filePath"],
                            "workspaceId": params.get("workspaceId").cloned().unwrap_or(Value::Null),
                            "session": session,
                        }))
                        .with_extra("context", "Read the note"))
                    })
                },
            ))
            .with_operation(operation(
                "createContent",
                "Create a note",
                json!({
                    "type": "object",
                    "properties": {
                        "filePath": {"type": "string", "description": "Path of the note"},
                        "content": {"type": "string"},
                        "overwrite": {"type": "boolean", "default": false}
                    },
                    "required": ["filePath"]
                }),
                |_ctx, params| {
                    Box::pin(async move {
                        Ok(OperationResult::ok(json!({
                            "created": params["filePath"],
                            "overwrite": params["overwrite"],
                        })))
                    })
                },
            ))
            .with_operation(operation(
                "batchMove",
                "Move several notes",
                json!({
                    "type": "object",
                    "properties": {
                        "paths": {"type": "array", "items": {"type": "string"}},
                        "destination": {"type": "string"}
                    },
                    "required": ["paths", "destination"]
                }),
                |_ctx, params| {
                    Box::pin(async move { Ok(OperationResult::ok(json!({ "moved": params["paths"] }))) })
                },
            ))
            .with_operation(operation(
                "deleteContent",
                "Delete a note",
                json!({
                    "type": "object",
                    "properties": {"filePath": {"type": "string", "description": "Path of the note"}},
                    "required": ["filePath"]
                }),
                |_ctx, _params| Box::pin(async move { Err(CoreError::operation("vault is read-only")) }),
            ))
            .with_help(Arc::new(ContentHelp)),
    )
}

/// `vaultManager`: switches the session's workspace.
pub fn vault_manager() -> Arc<dyn CapabilityProvider> {
    Arc::new(
        StaticProvider::new("vaultManager", "Manage workspaces").with_operation(operation(
            "openWorkspace",
            "Make a workspace active",
            json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"]
            }),
            |_ctx, params| {
                let id = params["id"].as_str().unwrap_or_default().to_string();
                Box::pin(async move {
                    Ok(OperationResult::ok(json!({ "opened": id.clone() })).with_workspace_context(
                        WorkspaceContext::new(id.clone())
                            .with_path(["root".to_string(), id])
                            .with_active(true),
                    ))
                })
            },
        )),
    )
}

/// `A`: hands off to `B` in various shapes.
pub fn provider_a() -> Arc<dyn CapabilityProvider> {
    Arc::new(
        StaticProvider::new("A", "Origin provider")
            .with_operation(operation("x", "Hand off to B.y", json!({"type": "object"}), |_ctx, _params| {
                Box::pin(async move {
                    Ok(OperationResult::ok_empty().with_handoff(Handoff::Single(
                        HandoffDirective::new("B", "y").returning_here(false),
                    )))
                })
            }))
            .with_operation(operation(
                "stay",
                "Hand off to B.y and come back",
                json!({"type": "object"}),
                |_ctx, _params| {
                    Box::pin(async move {
                        Ok(OperationResult::ok(json!({"origin": "A.stay"})).with_handoff(Handoff::Single(
                            HandoffDirective::new("B", "y").returning_here(true),
                        )))
                    })
                },
            ))
            .with_operation(operation(
                "fanout",
                "Hand off to three B operations",
                json!({"type": "object"}),
                |_ctx, _params| {
                    Box::pin(async move {
                        Ok(OperationResult::ok(json!({"origin": "A.fanout"})).with_handoff(
                            Handoff::Multiple(vec![
                                HandoffDirective::new("B", "y").with_call_name("first"),
                                HandoffDirective::new("B", "broken").with_call_name("second"),
                                HandoffDirective::new("B", "switch")
                                    .with_parameters(json!({"id": "ws-chain"}))
                                    .with_call_name("third"),
                            ]),
                        ))
                    })
                },
            )),
    )
}

pub fn b_y_result() -> OperationResult {
    OperationResult::ok(json!({"from": "B.y"}))
}

/// `B`: handoff targets.
pub fn provider_b() -> Arc<dyn CapabilityProvider> {
    Arc::new(
        StaticProvider::new("B", "Target provider")
            .with_operation(operation("y", "Plain result", json!({"type": "object"}), |_ctx, _params| {
                Box::pin(async move { Ok(b_y_result()) })
            }))
            .with_operation(operation("broken", "Always fails", json!({"type": "object"}), |_ctx, _params| {
                Box::pin(async move { Err(CoreError::operation("B is broken")) })
            }))
            .with_operation(operation(
                "switch",
                "Switch workspace",
                json!({"type": "object", "properties": {"id": {"type": "string"}}}),
                |_ctx, params| {
                    let id = params["id"].as_str().unwrap_or("ws-b").to_string();
                    Box::pin(async move {
                        Ok(OperationResult::ok_empty().with_workspace_context(WorkspaceContext::new(id)))
                    })
                },
            )),
    )
}

pub fn router_with(config: RouterConfig) -> Router {
    Router::builder()
        .config(config)
        .provider(content_manager())
        .provider(vault_manager())
        .provider(provider_a())
        .provider(provider_b())
        .build()
        .expect("router builds")
}

pub fn router() -> Router {
    router_with(RouterConfig::default())
}

pub fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("arguments must be an object, got {}", other),
    }
}

/// Parsed JSON payload of a tool-call response.
pub fn payload(response: &ToolCallResponse) -> Value {
    assert_eq!(response.content.len(), 1);
    assert_eq!(response.content[0].kind, "text");
    serde_json::from_str(&response.content[0].text).expect("content is JSON")
}
