//! Session Tests
//!
//! First-contact standardization, the one-time instructions banner and
//! workspace context carried between calls of the same session.

use std::sync::Arc;

use serde_json::json;

use nexus_router::services::{SessionIdValidator, SESSION_INSTRUCTIONS_KEY};
use nexus_router::{
    ErrorCode, JsonRpcRequest, Router, RouterConfig, SessionContextStore, WorkspaceContext,
};

use super::fixtures::{args, content_manager, payload, router, router_with, vault_manager, SESSION};

// ============================================================================
// Standardization and instructions
// ============================================================================

#[tokio::test]
async fn test_nonstandard_id_is_replaced_and_instructed_once() {
    let router = router();
    let first = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": "my-session", "filePath": "a.md"})),
        )
        .await
        .unwrap();
    let body = payload(&first);

    let new_id = body["sessionId"].as_str().unwrap().to_string();
    assert_ne!(new_id, "my-session");
    assert!(SessionIdValidator::is_standard(&new_id));
    // The operation itself already ran under the standardized id
    assert_eq!(body["data"]["session"], new_id.as_str());

    let banner = body[SESSION_INSTRUCTIONS_KEY].as_str().unwrap();
    assert!(banner.contains(&new_id));
    assert!(banner.contains("my-session"));
    assert!(body["context"].as_str().unwrap().starts_with("SESSION STARTED"));
    assert!(router.session_store().has_been_instructed(&new_id));

    let second = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": new_id, "filePath": "a.md"})),
        )
        .await
        .unwrap();
    let body = payload(&second);
    assert!(body.get(SESSION_INSTRUCTIONS_KEY).is_none());
    assert_eq!(body["context"], "Read the note");
}

#[tokio::test]
async fn test_failed_first_call_still_reports_issued_id() {
    let router = router();
    let response = router
        .handle_request(JsonRpcRequest::new(
            1,
            "tools/call",
            json!({"name": "contentManager", "arguments": {"mode": "readContent", "sessionId": "my-session"}}),
        ))
        .await;
    let error = response.error.unwrap();
    assert_eq!(error.code, ErrorCode::InvalidParams);

    let data = error.data.unwrap();
    assert_eq!(data["issues"][0]["field"], "filePath");
    let issued = data["sessionId"].as_str().unwrap().to_string();
    assert_ne!(issued, "my-session");
    assert!(SessionIdValidator::is_standard(&issued));

    let retry = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": issued, "filePath": "a.md"})),
        )
        .await
        .unwrap();
    assert_eq!(payload(&retry)["data"]["session"], issued.as_str());
}

#[tokio::test]
async fn test_failed_call_with_standard_id_adds_no_session_data() {
    let router = router();
    let err = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": SESSION})),
        )
        .await
        .unwrap_err();
    assert!(err.session_id().is_none());
    assert!(err.to_protocol().data.unwrap().get("sessionId").is_none());
}

#[tokio::test]
async fn test_padded_standard_id_gets_replaced_with_banner() {
    let router = router();
    let padded = format!(" {}", SESSION);
    let response = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": padded, "filePath": "a.md"})),
        )
        .await
        .unwrap();
    let body = payload(&response);
    let id = body["sessionId"].as_str().unwrap();
    assert_ne!(id, padded);
    assert!(SessionIdValidator::is_standard(id));
    assert!(body.get(SESSION_INSTRUCTIONS_KEY).is_some());
}

#[tokio::test]
async fn test_missing_session_id_gets_generated_one() {
    let router = router();
    let response = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "filePath": "a.md"})),
        )
        .await
        .unwrap();
    let body = payload(&response);
    let id = body["sessionId"].as_str().unwrap();
    assert!(SessionIdValidator::is_standard(id));
    let banner = body[SESSION_INSTRUCTIONS_KEY].as_str().unwrap();
    assert!(!banner.contains("not in the standard format"));
}

#[tokio::test]
async fn test_standard_id_is_kept_without_banner() {
    let router = router();
    let response = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": SESSION, "filePath": "a.md"})),
        )
        .await
        .unwrap();
    let body = payload(&response);
    assert!(body.get(SESSION_INSTRUCTIONS_KEY).is_none());
    assert_eq!(body["data"]["session"], SESSION);
}

#[tokio::test]
async fn test_each_nonstandard_call_starts_a_new_session_by_default() {
    let router = router();
    let mut ids = Vec::new();
    for _ in 0..2 {
        let response = router
            .call_tool(
                "contentManager",
                args(json!({"mode": "readContent", "sessionId": "chat-42", "filePath": "a.md"})),
            )
            .await
            .unwrap();
        ids.push(payload(&response)["sessionId"].as_str().unwrap().to_string());
    }
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_retained_alias_maps_back_to_same_session() {
    let mut config = RouterConfig::default();
    config.session.retain_aliases = true;
    let router = router_with(config);

    let first = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": "chat-42", "filePath": "a.md"})),
        )
        .await
        .unwrap();
    let id = payload(&first)["sessionId"].as_str().unwrap().to_string();
    assert_eq!(router.session_store().alias_for("chat-42"), Some(id.clone()));

    let second = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": "chat-42", "filePath": "a.md"})),
        )
        .await
        .unwrap();
    let body = payload(&second);
    assert_eq!(body["data"]["session"], id.as_str());
    assert!(body.get(SESSION_INSTRUCTIONS_KEY).is_none());
}

// ============================================================================
// Workspace context
// ============================================================================

#[tokio::test]
async fn test_workspace_context_carries_to_next_call() {
    let router = router();
    router
        .call_tool(
            "vaultManager",
            args(json!({"mode": "openWorkspace", "sessionId": SESSION, "id": "ws-notes"})),
        )
        .await
        .unwrap();

    let stored = router.session_store().get(SESSION).unwrap();
    assert_eq!(stored.workspace_id, "ws-notes");
    assert_eq!(
        stored.workspace_path,
        Some(vec!["root".to_string(), "ws-notes".to_string()])
    );

    let response = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": SESSION, "filePath": "a.md"})),
        )
        .await
        .unwrap();
    assert_eq!(payload(&response)["data"]["workspaceId"], "ws-notes");
}

#[tokio::test]
async fn test_explicit_workspace_id_wins_over_stored_context() {
    let router = router();
    router
        .session_store()
        .set(SESSION, WorkspaceContext::new("ws-stored"));

    let response = router
        .call_tool(
            "contentManager",
            args(json!({
                "mode": "readContent",
                "sessionId": SESSION,
                "filePath": "a.md",
                "workspaceId": "ws-explicit"
            })),
        )
        .await
        .unwrap();
    assert_eq!(payload(&response)["data"]["workspaceId"], "ws-explicit");
}

#[tokio::test]
async fn test_contexts_are_isolated_per_session() {
    let router = router();
    router
        .call_tool(
            "vaultManager",
            args(json!({"mode": "openWorkspace", "sessionId": SESSION, "id": "ws-one"})),
        )
        .await
        .unwrap();

    let other = "s-20250101120001";
    let response = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": other, "filePath": "a.md"})),
        )
        .await
        .unwrap();
    assert!(payload(&response)["data"]["workspaceId"].is_null());
}

#[tokio::test]
async fn test_default_context_applies_to_unknown_sessions() {
    let store = Arc::new(SessionContextStore::new());
    store.set_default(Some(WorkspaceContext::new("ws-default")));
    let router = Router::builder()
        .provider(content_manager())
        .provider(vault_manager())
        .session_store(Arc::clone(&store))
        .build()
        .unwrap();

    let response = router
        .call_tool(
            "contentManager",
            args(json!({"mode": "readContent", "sessionId": SESSION, "filePath": "a.md"})),
        )
        .await
        .unwrap();
    assert_eq!(payload(&response)["data"]["workspaceId"], "ws-default");
}

#[tokio::test]
async fn test_shutdown_forgets_sessions() {
    let router = router();
    router
        .call_tool(
            "vaultManager",
            args(json!({"mode": "openWorkspace", "sessionId": SESSION, "id": "ws-notes"})),
        )
        .await
        .unwrap();
    assert_eq!(router.session_store().session_count(), 1);

    router.shutdown();
    assert_eq!(router.session_store().session_count(), 0);
    assert!(router.session_store().get(SESSION).is_none());
}
