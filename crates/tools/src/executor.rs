//! Operation Result and Handoff Types
//!
//! The value every operation returns, plus the handoff directives an
//! operation can attach to ask the router to continue into another
//! provider/operation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use nexus_router_core::WorkspaceContext;

/// Result of an operation execution.
///
/// Fields beyond the fixed ones (for example a human-readable `context`
/// string) are kept in `extra` and serialized inline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Payload produced by the operation (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error message (if failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// New workspace context for the calling session; replaces the stored one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_context: Option<WorkspaceContext>,
    /// Continuation requested by the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<Handoff>,
    /// Outcome of a single `returnHere` handoff
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_result: Option<Box<OperationResult>>,
    /// Outcomes of a multi-directive handoff, in sequence order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_results: Option<Vec<HandoffEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_summary: Option<HandoffSummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OperationResult {
    /// Create a successful result carrying data
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// Create a successful result without data
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_workspace_context(mut self, ctx: WorkspaceContext) -> Self {
        self.workspace_context = Some(ctx);
        self
    }

    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.handoff = Some(handoff);
        self
    }

    /// Attach an extra top-level field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Convert to text for the orchestrator: the result as pretty JSON.
    pub fn to_content(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(
                "{{\"success\": false, \"error\": \"Failed to serialize result: {}\"}}",
                e
            )
        })
    }
}

// ============================================================================
// Handoff directives
// ============================================================================

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Request to continue execution into another provider/operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffDirective {
    pub target_provider: String,
    pub target_operation: String,
    #[serde(default = "empty_object")]
    pub parameters: Value,
    /// Merge the handoff outcome back into the originating result
    #[serde(default)]
    pub return_here: bool,
    /// Caller-chosen label reported back with the handoff outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_name: Option<String>,
}

impl HandoffDirective {
    pub fn new(target_provider: impl Into<String>, target_operation: impl Into<String>) -> Self {
        Self {
            target_provider: target_provider.into(),
            target_operation: target_operation.into(),
            parameters: empty_object(),
            return_here: false,
            call_name: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn returning_here(mut self, return_here: bool) -> Self {
        self.return_here = return_here;
        self
    }

    pub fn with_call_name(mut self, name: impl Into<String>) -> Self {
        self.call_name = Some(name.into());
        self
    }
}

/// A single directive or an ordered chain of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Handoff {
    Single(HandoffDirective),
    Multiple(Vec<HandoffDirective>),
}

impl Handoff {
    /// Directives in execution order.
    pub fn directives(&self) -> Vec<&HandoffDirective> {
        match self {
            Handoff::Single(d) => vec![d],
            Handoff::Multiple(list) => list.iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Handoff::Multiple(list) if list.is_empty())
    }
}

/// One executed directive of a multi handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffEntry {
    /// Zero-based position in the supplied directive list
    pub sequence: usize,
    pub target_provider: String,
    pub target_operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_name: Option<String>,
    #[serde(flatten)]
    pub result: OperationResult,
}

impl HandoffEntry {
    pub fn new(sequence: usize, directive: &HandoffDirective, result: OperationResult) -> Self {
        Self {
            sequence,
            target_provider: directive.target_provider.clone(),
            target_operation: directive.target_operation.clone(),
            call_name: directive.call_name.clone(),
            result,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffSummary {
    pub success_count: usize,
    pub failure_count: usize,
}

impl HandoffSummary {
    pub fn from_entries(entries: &[HandoffEntry]) -> Self {
        let success_count = entries.iter().filter(|e| e.result.success).count();
        Self {
            success_count,
            failure_count: entries.len() - success_count,
        }
    }
}
