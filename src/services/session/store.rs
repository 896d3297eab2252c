//! Session Context Store
//!
//! In-process map from session id to workspace context, the set of
//! sessions that already received first-contact instructions, an optional
//! process-wide default context, and the alias map for standardized ids.
//!
//! Built with the router and cleared on shutdown. Nothing is persisted.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use nexus_router_core::{has_workspace_id, WorkspaceContext};
use nexus_router_tools::OperationResult;

#[derive(Debug, Default)]
struct SessionState {
    contexts: HashMap<String, WorkspaceContext>,
    instructed: HashSet<String>,
    default_context: Option<WorkspaceContext>,
    /// Original (non-standard) name -> standard id issued for it
    aliases: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct SessionContextStore {
    state: RwLock<SessionState>,
}

impl SessionContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Context stored for `session_id`, else the default, else `None`.
    pub fn get(&self, session_id: &str) -> Option<WorkspaceContext> {
        let state = self.read();
        state
            .contexts
            .get(session_id)
            .or(state.default_context.as_ref())
            .cloned()
    }

    /// Overwrite the context of `session_id`.
    ///
    /// A context without a workspace id is rejected (logged, not stored).
    pub fn set(&self, session_id: &str, context: WorkspaceContext) {
        if session_id.trim().is_empty() {
            tracing::warn!("[SessionStore] Ignoring context for a blank session id");
            return;
        }
        if !context.is_valid() {
            tracing::warn!(
                session_id = %session_id,
                "[SessionStore] Rejecting workspace context without workspaceId"
            );
            return;
        }
        tracing::debug!(
            session_id = %session_id,
            workspace_id = %context.workspace_id,
            "[SessionStore] Stored workspace context"
        );
        self.write().contexts.insert(session_id.to_string(), context);
    }

    /// Set or clear the process-wide default context.
    pub fn set_default(&self, context: Option<WorkspaceContext>) {
        match context {
            Some(ctx) if !ctx.is_valid() => {
                tracing::warn!("[SessionStore] Rejecting default context without workspaceId");
            }
            other => self.write().default_context = other,
        }
    }

    /// Merge the session's (or the default) context into `params`.
    ///
    /// Params already carrying a non-empty `workspaceId` are returned as-is,
    /// as are non-object params.
    pub fn apply_to(&self, session_id: &str, params: Value) -> Value {
        let Value::Object(mut map) = params else {
            return params;
        };
        if has_workspace_id(&map) {
            return Value::Object(map);
        }
        if let Some(context) = self.get(session_id) {
            context.merge_into(&mut map);
        }
        Value::Object(map)
    }

    /// Store the result's workspace context, if it carries one.
    pub fn update_from_result(&self, session_id: &str, result: &OperationResult) {
        if let Some(context) = &result.workspace_context {
            self.set(session_id, context.clone());
        }
    }

    pub fn mark_instructed(&self, session_id: &str) {
        self.write().instructed.insert(session_id.to_string());
    }

    pub fn has_been_instructed(&self, session_id: &str) -> bool {
        self.read().instructed.contains(session_id)
    }

    /// Clear the instructed flag so the next call shows instructions again.
    pub fn reset_instructed(&self, session_id: &str) -> bool {
        self.write().instructed.remove(session_id)
    }

    /// Forget one session's context, flag, and aliases pointing at it.
    pub fn clear_session(&self, session_id: &str) {
        let mut state = self.write();
        state.contexts.remove(session_id);
        state.instructed.remove(session_id);
        state.aliases.retain(|_, id| id != session_id);
    }

    /// Drop every session, alias, and the default context.
    pub fn clear_all(&self) {
        let mut state = self.write();
        let sessions = state.contexts.len();
        *state = SessionState::default();
        tracing::info!("[SessionStore] Cleared {} session contexts", sessions);
    }

    /// Number of sessions with a stored context or an instructed flag.
    pub fn session_count(&self) -> usize {
        let state = self.read();
        state
            .contexts
            .keys()
            .chain(state.instructed.iter())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn record_alias(&self, original: &str, session_id: &str) {
        self.write()
            .aliases
            .insert(original.to_string(), session_id.to_string());
    }

    pub fn alias_for(&self, original: &str) -> Option<String> {
        self.read().aliases.get(original).cloned()
    }
}
