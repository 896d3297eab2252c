//! Router Flow Tests
//!
//! Requests enter through `handle_request` or the convenience methods and
//! leave as JSON-RPC responses or tool-call content.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use nexus_router::models::{
    PromptDescriptor, ResourceContents, ResourceDescriptor, ToolCallResponse,
};
use nexus_router::services::{PromptSource, ResourceSource};
use nexus_router::{CoreError, ErrorCode, JsonRpcRequest, Router, RouterConfig, UnionPolicy};
use nexus_router_core::CoreResult;

use super::fixtures::{args, content_manager, payload, router, router_with, SESSION};

// ============================================================================
// tools/list
// ============================================================================

#[tokio::test]
async fn test_tools_list_exposes_one_tool_per_provider() {
    let router = router();
    let response = router
        .handle_request(JsonRpcRequest::new(1, "tools/list", Value::Null))
        .await;
    assert!(!response.is_error());
    assert_eq!(response.id, json!(1));

    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    let mut names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["A_default", "B_default", "contentManager_default", "vaultManager_default"]
    );
}

#[tokio::test]
async fn test_mode_enum_lists_every_operation_in_order() {
    let router = router();
    let schema = router.schema_for("contentManager").unwrap();
    assert_eq!(
        schema["properties"]["mode"]["enum"],
        json!(["readContent", "createContent", "batchMove", "deleteContent"])
    );
    assert_eq!(schema["required"], json!(["mode", "sessionId"]));

    let descriptor = router
        .list_tools()
        .into_iter()
        .find(|t| t.name == "contentManager_default")
        .unwrap();
    assert_eq!(descriptor.input_schema, *schema);
}

#[tokio::test]
async fn test_tenant_suffix_in_tool_names() {
    let config = RouterConfig {
        tenant: "My Vault".to_string(),
        ..RouterConfig::default()
    };
    let router = router_with(config);
    assert_eq!(router.tenant(), "my-vault");
    assert!(router
        .list_tools()
        .iter()
        .any(|t| t.name == "contentManager_my-vault"));

    let response = router
        .call_tool(
            "contentManager_my-vault",
            args(json!({"mode": "readContent", "sessionId": SESSION, "filePath": "a.md"})),
        )
        .await
        .unwrap();
    assert_eq!(payload(&response)["data"]["filePath"], "a.md");
}

// ============================================================================
// tools/call
// ============================================================================

#[tokio::test]
async fn test_call_through_jsonrpc_envelope() {
    let router = router();
    let request = JsonRpcRequest::new(
        "req-7",
        "tools/call",
        json!({
            "name": "contentManager_default",
            "arguments": {"mode": "createContent", "sessionId": SESSION, "filePath": "a.md", "content": "hi"}
        }),
    );
    let response = router.handle_request(request).await;
    assert_eq!(response.id, json!("req-7"));

    let result: ToolCallResponse = serde_json::from_value(response.result.unwrap()).unwrap();
    assert!(!result.is_error);
    let body = payload(&result);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["created"], "a.md");
    // Schema default filled in before dispatch
    assert_eq!(body["data"]["overwrite"], false);
}

#[tokio::test]
async fn test_unknown_tool_is_not_found() {
    let router = router();
    let response = router
        .handle_request(JsonRpcRequest::new(
            2,
            "tools/call",
            json!({"name": "ghost_default", "arguments": {"mode": "x"}}),
        ))
        .await;
    let error = response.error.unwrap();
    assert_eq!(error.code, ErrorCode::NotFound);
    assert!(error.message.contains("ghost_default"));
}

#[tokio::test]
async fn test_unknown_mode_is_invalid_params() {
    let router = router();
    let err = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "renameContent", "sessionId": SESSION})),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParams);
    assert!(err.to_string().contains("mode"));
}

#[tokio::test]
async fn test_missing_field_reports_field_and_hint() {
    let router = router();
    let response = router
        .handle_request(JsonRpcRequest::new(
            3,
            "tools/call",
            json!({"name": "contentManager", "arguments": {"mode": "readContent", "sessionId": SESSION}}),
        ))
        .await;
    let error = response.error.unwrap();
    assert_eq!(error.code, ErrorCode::InvalidParams);
    assert!(error.message.contains("Missing required parameters"));
    assert!(error.message.contains("filePath"));

    let issues = error.data.unwrap()["issues"].as_array().unwrap().clone();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["field"], "filePath");
    assert_eq!(issues[0]["kind"], "missing");
    assert!(issues[0]["hint"].as_str().unwrap().contains("Path of the note"));
}

#[tokio::test]
async fn test_serialized_paths_array_is_normalized() {
    let router = router();
    let response = router
        .call_tool(
            "contentManager",
            args(json!({
                "mode": "batchMove",
                "sessionId": SESSION,
                "paths": "[\"a.md\", \"b.md\"]",
                "destination": "archive"
            })),
        )
        .await
        .unwrap();
    assert_eq!(payload(&response)["data"]["moved"], json!(["a.md", "b.md"]));
}

#[tokio::test]
async fn test_wrong_item_type_names_the_index() {
    let router = router();
    let err = router
        .call_tool(
            "contentManager",
            args(json!({
                "mode": "batchMove",
                "sessionId": SESSION,
                "paths": ["a.md", 7],
                "destination": "archive"
            })),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParams);
    assert!(err.to_string().contains("paths[1]"));
}

#[tokio::test]
async fn test_dispatch_rule_rejects_empty_content() {
    let router = router();
    let err = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "createContent", "sessionId": SESSION, "filePath": "a.md", "content": "  "})),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParams);
    assert!(err.to_string().contains("contentManager.createContent"));
    assert!(err.to_string().contains("content"));
}

#[tokio::test]
async fn test_operation_failure_is_internal_with_diagnostics() {
    let router = router();
    let response = router
        .handle_request(JsonRpcRequest::new(
            4,
            "tools/call",
            json!({"name": "contentManager", "arguments": {"mode": "deleteContent", "sessionId": SESSION, "filePath": "a.md"}}),
        ))
        .await;
    let error = response.error.unwrap();
    assert_eq!(error.code, ErrorCode::InternalError);
    assert!(error.message.contains("vault is read-only"));

    let data = error.data.unwrap();
    assert_eq!(data["provider"], "contentManager");
    assert_eq!(data["operation"], "deleteContent");
    assert!(data["callId"].as_str().is_some());
}

#[tokio::test]
async fn test_unknown_method_and_bad_version() {
    let router = router();
    let response = router
        .handle_request(JsonRpcRequest::new(5, "tools/delete", Value::Null))
        .await;
    assert_eq!(response.error.unwrap().code, ErrorCode::NotFound);

    let mut request = JsonRpcRequest::new(6, "tools/list", Value::Null);
    request.jsonrpc = "1.0".to_string();
    let response = router.handle_request(request).await;
    assert_eq!(response.error.unwrap().code, ErrorCode::InvalidParams);
}

// ============================================================================
// tools/help
// ============================================================================

#[tokio::test]
async fn test_help_for_provider_and_mode() {
    let router = router();
    let overview = router
        .handle(
            "tools/help",
            json!({"name": "contentManager_default"}),
        )
        .await
        .unwrap();
    let text = overview["content"][0]["text"].as_str().unwrap().to_string();
    for slug in ["readContent", "createContent", "batchMove", "deleteContent"] {
        assert!(text.contains(slug), "overview lists {}", slug);
    }

    let generated = router
        .handle(
            "tools/help",
            json!({"name": "contentManager", "mode": "readContent"}),
        )
        .await
        .unwrap();
    let text = generated["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("filePath"));
    assert!(text.contains("Path of the note"));

    let authored = router
        .handle(
            "tools/help",
            json!({"name": "contentManager", "mode": "createContent"}),
        )
        .await
        .unwrap();
    assert!(authored["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Creates a note. Overwrites nothing."));
}

#[tokio::test]
async fn test_help_for_unknown_mode_is_not_found() {
    let router = router();
    let err = router
        .handle("tools/help", json!({"name": "contentManager", "mode": "nope"}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

// ============================================================================
// resources/* and prompts/list
// ============================================================================

struct NoteResources;

#[async_trait]
impl ResourceSource for NoteResources {
    async fn list_resources(&self) -> CoreResult<Vec<ResourceDescriptor>> {
        Ok(vec![ResourceDescriptor {
            uri: "note://a.md".to_string(),
            name: "a.md".to_string(),
            description: None,
            mime_type: Some("text/markdown".to_string()),
        }])
    }

    async fn read_resource(&self, uri: &str) -> CoreResult<ResourceContents> {
        if uri != "note://a.md" {
            return Err(CoreError::not_found(format!("Resource not found: {}", uri)));
        }
        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: Some("text/markdown".to_string()),
            text: "# A".to_string(),
        })
    }
}

struct NotePrompts;

#[async_trait]
impl PromptSource for NotePrompts {
    async fn list_prompts(&self) -> CoreResult<Vec<PromptDescriptor>> {
        Ok(vec![PromptDescriptor {
            name: "summarize".to_string(),
            description: Some("Summarize a note".to_string()),
            arguments: Vec::new(),
        }])
    }
}

#[tokio::test]
async fn test_resources_and_prompts_without_sources() {
    let router = router();
    assert_eq!(
        router.handle("resources/list", Value::Null).await.unwrap(),
        json!({"resources": []})
    );
    assert_eq!(
        router.handle("prompts/list", Value::Null).await.unwrap(),
        json!({"prompts": []})
    );
    let err = router
        .handle("resources/read", json!({"uri": "note://a.md"}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_resources_and_prompts_forwarded_to_sources() {
    let router = Router::builder()
        .provider(content_manager())
        .resources(Arc::new(NoteResources))
        .prompts(Arc::new(NotePrompts))
        .build()
        .unwrap();

    let listed = router.handle("resources/list", Value::Null).await.unwrap();
    assert_eq!(listed["resources"][0]["uri"], "note://a.md");
    assert_eq!(listed["resources"][0]["mimeType"], "text/markdown");

    let read = router
        .handle("resources/read", json!({"uri": "note://a.md"}))
        .await
        .unwrap();
    assert_eq!(read["contents"][0]["text"], "# A");

    let missing = router
        .handle("resources/read", json!({"uri": "note://b.md"}))
        .await
        .unwrap_err();
    assert_eq!(missing.code(), ErrorCode::NotFound);

    let prompts = router.handle("prompts/list", Value::Null).await.unwrap();
    assert_eq!(prompts["prompts"][0]["name"], "summarize");
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_router_from_toml_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("router.toml");
    std::fs::write(
        &path,
        r#"
tenant = "work"

[schema]
union_policy = "flatten"

[[dispatch.rules]]
provider = "contentManager"
operation = "readContent"
fields = ["filePath"]
"#,
    )
    .unwrap();

    let config = RouterConfig::load(&path).unwrap();
    assert_eq!(config.schema.union_policy, UnionPolicy::Flatten);
    let router = router_with(config);
    assert_eq!(router.tenant(), "work");

    let err = router
        .call_tool(
            "contentManager_work",
            args(json!({"mode": "readContent", "sessionId": SESSION, "filePath": ""})),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParams);
    assert!(err.to_string().contains("filePath"));
}

#[test]
fn test_invalid_config_fails_build() {
    let mut config = RouterConfig::default();
    config.handoff.max_depth = 99;
    assert!(Router::builder().config(config).build().is_err());
}
