//! Response Formatter
//!
//! Serializes an operation result into tool-call content. On a session's
//! first contact (new or standardized id) it injects a one-time banner
//! telling the caller which session id to reuse.

use std::sync::Arc;

use serde_json::Value;

use nexus_router_tools::OperationResult;

use super::session::{SessionContextStore, SessionIdValidator, SessionInfo};
use crate::models::ToolCallResponse;

pub const SESSION_INSTRUCTIONS_KEY: &str = "sessionInstructions";
const CONTEXT_KEY: &str = "context";

pub struct ResponseFormatter {
    validator: Arc<SessionIdValidator>,
    store: Arc<SessionContextStore>,
}

impl ResponseFormatter {
    pub fn new(validator: Arc<SessionIdValidator>, store: Arc<SessionContextStore>) -> Self {
        Self { validator, store }
    }

    /// Shape `result` for the orchestrator, adding session instructions
    /// when they are due.
    pub fn format_execution_response(
        &self,
        result: &OperationResult,
        info: &SessionInfo,
    ) -> ToolCallResponse {
        let mut value = match serde_json::to_value(result) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("[ResponseFormatter] Failed to serialize result: {}", e);
                return ToolCallResponse::text(result.to_content());
            }
        };

        if self.validator.should_inject_instructions(info) {
            let banner = instructions_banner(info);
            if let Value::Object(map) = &mut value {
                if let Some(Value::String(context)) = map.get_mut(CONTEXT_KEY) {
                    *context = format!("{}\n\n{}", banner, context);
                }
                map.insert("sessionId".to_string(), Value::String(info.id.clone()));
                map.insert(SESSION_INSTRUCTIONS_KEY.to_string(), Value::String(banner));
            }
            self.store.mark_instructed(&info.id);
            tracing::info!(
                session_id = %info.id,
                "[ResponseFormatter] Session instructions delivered"
            );
        }

        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| result.to_content());
        let mut response = ToolCallResponse::text(text);
        response.is_error = !result.success;
        response
    }
}

/// The fixed first-contact banner for `info`.
pub fn instructions_banner(info: &SessionInfo) -> String {
    let mut banner = format!(
        "SESSION STARTED: your session id is \"{}\". Pass sessionId \"{}\" in every \
         following call so workspace context carries over.",
        info.id, info.id
    );
    if let Some(original) = &info.original_session_id {
        banner.push_str(&format!(
            " The id \"{}\" you supplied is not in the standard format and was replaced.",
            original
        ));
    }
    banner
}
