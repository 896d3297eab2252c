//! Workspace and Operation Context
//!
//! - `WorkspaceContext` - the project/document-set a session currently
//!   operates within; stored per session by the router
//! - `ExecutionContext` trait - read-only view an operation gets of the call
//! - `OperationContext` - concrete per-call context built by the dispatcher

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter key carrying the workspace identifier.
pub const WORKSPACE_ID_KEY: &str = "workspaceId";
/// Parameter key carrying the full workspace context object.
pub const WORKSPACE_CONTEXT_KEY: &str = "workspaceContext";

// ============================================================================
// WorkspaceContext
// ============================================================================

/// The active workspace a session operates within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceContext {
    pub workspace_id: String,
    /// Ordered path segments from the root workspace down to the active one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<Vec<String>>,
    #[serde(default)]
    pub active_workspace: bool,
}

impl WorkspaceContext {
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            workspace_path: None,
            active_workspace: false,
        }
    }

    pub fn with_path<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.workspace_path = Some(segments.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active_workspace = active;
        self
    }

    /// A context without a workspace id cannot be stored.
    pub fn is_valid(&self) -> bool {
        !self.workspace_id.trim().is_empty()
    }

    /// Merge this context into a parameter object.
    ///
    /// A caller-supplied non-empty `workspaceId` wins outright: the params are
    /// left untouched. Otherwise missing keys are filled, existing ones kept.
    pub fn merge_into(&self, params: &mut Map<String, Value>) {
        if has_workspace_id(params) {
            return;
        }
        params.insert(
            WORKSPACE_ID_KEY.to_string(),
            Value::String(self.workspace_id.clone()),
        );
        if let Some(path) = &self.workspace_path {
            params
                .entry("workspacePath")
                .or_insert_with(|| Value::from(path.clone()));
        }
        params
            .entry("activeWorkspace")
            .or_insert(Value::Bool(self.active_workspace));
        if !params.contains_key(WORKSPACE_CONTEXT_KEY) {
            if let Ok(value) = serde_json::to_value(self) {
                params.insert(WORKSPACE_CONTEXT_KEY.to_string(), value);
            }
        }
    }
}

/// Whether a parameter object carries a non-empty `workspaceId`.
pub fn has_workspace_id(params: &Map<String, Value>) -> bool {
    params
        .get(WORKSPACE_ID_KEY)
        .and_then(|v| v.as_str())
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}

// ============================================================================
// ExecutionContext Trait
// ============================================================================

/// Read-only information about the call an operation is serving.
pub trait ExecutionContext: Send + Sync {
    /// Standardized session identifier for this call.
    fn session_id(&self) -> &str;

    /// Name of the provider that owns the executing operation.
    fn provider_name(&self) -> &str;

    /// Slug of the executing operation.
    fn operation(&self) -> &str;

    /// Workspace the session is bound to, if any.
    fn workspace(&self) -> Option<&WorkspaceContext> {
        None
    }
}

// ============================================================================
// OperationContext
// ============================================================================

/// Per-call context handed to an operation by the dispatcher.
#[derive(Debug, Clone)]
pub struct OperationContext {
    session_id: String,
    provider_name: String,
    operation: String,
    /// Unique identifier for this execution, used in log correlation.
    call_id: String,
    workspace: Option<WorkspaceContext>,
    /// Position in a handoff chain; 0 for the directly requested call.
    handoff_depth: usize,
}

impl OperationContext {
    pub fn new(
        session_id: impl Into<String>,
        provider_name: impl Into<String>,
        operation: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            provider_name: provider_name.into(),
            operation: operation.into(),
            call_id: call_id.into(),
            workspace: None,
            handoff_depth: 0,
        }
    }

    pub fn with_workspace(mut self, workspace: Option<WorkspaceContext>) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_handoff_depth(mut self, depth: usize) -> Self {
        self.handoff_depth = depth;
        self
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn handoff_depth(&self) -> usize {
        self.handoff_depth
    }
}

impl ExecutionContext for OperationContext {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn operation(&self) -> &str {
        &self.operation
    }

    fn workspace(&self) -> Option<&WorkspaceContext> {
        self.workspace.as_ref()
    }
}
