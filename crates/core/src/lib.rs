//! Nexus Router Core
//!
//! Foundational error types, protocol error codes, and the workspace/session
//! context types shared by every crate in the Nexus router workspace. This
//! crate has no dependency on providers, schemas, or the request router.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`), protocol codes
//!   (`ErrorCode`, `ProtocolError`) and field-level validation errors
//! - `context` - Workspace context and the per-call `OperationContext`

pub mod error;
pub mod context;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{
    CoreError, CoreResult, ErrorCode, FieldIssue, IssueKind, ProtocolError, ValidationError,
};

// ── Context ────────────────────────────────────────────────────────────
pub use context::{
    has_workspace_id, ExecutionContext, OperationContext, WorkspaceContext, WORKSPACE_CONTEXT_KEY,
    WORKSPACE_ID_KEY,
};
