//! Core Error Types
//!
//! Defines the error types used across the Nexus router workspace and the
//! coarse protocol codes they surface as.
//!
//! Variants split into two groups:
//! - protocol-level (`InvalidParams`, `Validation`, `NotFound`, `Internal`),
//!   which map directly onto a JSON-RPC error code
//! - everything else (`Config`, `Io`, `Serialization`, `Operation`), which the
//!   dispatcher wraps into `Internal` via [`CoreError::into_protocol`] before it
//!   reaches a caller

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

// ============================================================================
// Protocol codes
// ============================================================================

/// Coarse error code exposed to the orchestrator.
///
/// Serialized as the JSON-RPC integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ErrorCode {
    /// Malformed or missing fields, bad batch shapes, unknown mode
    InvalidParams,
    /// Unknown provider, operation, or request method
    NotFound,
    /// Anything unexpected from an operation or its dependencies
    InternalError,
}

impl ErrorCode {
    /// JSON-RPC numeric code.
    pub fn as_i64(self) -> i64 {
        match self {
            ErrorCode::InvalidParams => -32602,
            ErrorCode::NotFound => -32601,
            ErrorCode::InternalError => -32603,
        }
    }

    /// Stable name used in logs and diagnostic payloads.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::InvalidParams => "InvalidParams",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::InternalError => "InternalError",
        }
    }
}

impl From<ErrorCode> for i64 {
    fn from(code: ErrorCode) -> i64 {
        code.as_i64()
    }
}

impl TryFrom<i64> for ErrorCode {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -32602 => Ok(ErrorCode::InvalidParams),
            -32601 => Ok(ErrorCode::NotFound),
            -32603 => Ok(ErrorCode::InternalError),
            other => Err(format!("Unknown protocol error code: {}", other)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured error object returned to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ============================================================================
// Field-level validation errors
// ============================================================================

/// What is wrong with a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    TypeMismatch,
    InvalidValue,
    InvalidBatchItem,
    UnmatchedBranch,
}

/// One offending field, with a hint derived from the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    pub field: String,
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl FieldIssue {
    pub fn new(
        field: impl Into<String>,
        kind: IssueKind,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
            hint,
        }
    }
}

/// Every offending field found in one validation pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Names of the fields reported as missing, in report order.
    pub fn missing_fields(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|i| i.kind == IssueKind::Missing)
            .map(|i| i.field.as_str())
            .collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (missing, invalid): (Vec<&FieldIssue>, Vec<&FieldIssue>) = self
            .issues
            .iter()
            .partition(|i| i.kind == IssueKind::Missing);

        let mut sections = Vec::new();
        if !missing.is_empty() {
            let mut section = String::from("Missing required parameters:");
            for issue in missing {
                match &issue.hint {
                    Some(hint) => section.push_str(&format!("\n  - {} ({})", issue.field, hint)),
                    None => section.push_str(&format!("\n  - {}", issue.field)),
                }
            }
            sections.push(section);
        }
        if !invalid.is_empty() {
            let mut section = String::from("Invalid parameters:");
            for issue in invalid {
                section.push_str(&format!("\n  - {}: {}", issue.field, issue.message));
                if let Some(hint) = &issue.hint {
                    section.push_str(&format!(" [{}]", hint));
                }
            }
            sections.push(section);
        }
        if sections.is_empty() {
            return f.write_str("Parameter validation failed");
        }
        f.write_str(&sections.join("\n"))
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// CoreError
// ============================================================================

/// Core error type for the Nexus router workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed request-level parameters
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Field-level schema validation failures
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Unknown provider, operation, or method
    #[error("Not found: {0}")]
    NotFound(String),

    /// Protocol-level internal error with optional diagnostic payload
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        data: Option<Value>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failures raised by an operation's own logic
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Any of the above, raised while serving a freshly issued session id
    #[error("{source}")]
    InSession {
        session_id: String,
        source: Box<CoreError>,
    },
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an invalid params error
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error without diagnostic data
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            data: None,
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an operation error
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Tag the error with the session id the call ran under, so a caller
    /// whose id was replaced still learns the new one.
    pub fn in_session(self, session_id: impl Into<String>) -> Self {
        match self {
            CoreError::InSession { source, .. } => CoreError::InSession {
                session_id: session_id.into(),
                source,
            },
            other => CoreError::InSession {
                session_id: session_id.into(),
                source: Box::new(other),
            },
        }
    }

    /// Session id attached by [`CoreError::in_session`], if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            CoreError::InSession { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    /// Coarse protocol code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::InSession { source, .. } => source.code(),
            CoreError::InvalidParams(_) | CoreError::Validation(_) => ErrorCode::InvalidParams,
            CoreError::NotFound(_) => ErrorCode::NotFound,
            _ => ErrorCode::InternalError,
        }
    }

    /// Whether this error already carries a protocol-level meaning.
    pub fn is_protocol(&self) -> bool {
        if let CoreError::InSession { source, .. } = self {
            return source.is_protocol();
        }
        matches!(
            self,
            CoreError::InvalidParams(_)
                | CoreError::Validation(_)
                | CoreError::NotFound(_)
                | CoreError::Internal { .. }
        )
    }

    fn variant_name(&self) -> &'static str {
        match self {
            CoreError::InvalidParams(_) => "InvalidParams",
            CoreError::Validation(_) => "Validation",
            CoreError::NotFound(_) => "NotFound",
            CoreError::Internal { .. } => "Internal",
            CoreError::Config(_) => "Config",
            CoreError::Io(_) => "Io",
            CoreError::Serialization(_) => "Serialization",
            CoreError::Operation(_) => "Operation",
            CoreError::InSession { source, .. } => source.variant_name(),
        }
    }

    /// Wrap a non-protocol error into `Internal`, keeping the original
    /// message and recording the cause as diagnostic data.
    ///
    /// Protocol-level errors are returned unchanged.
    pub fn into_protocol(self) -> Self {
        if let CoreError::InSession { session_id, source } = self {
            return CoreError::InSession {
                session_id,
                source: Box::new(source.into_protocol()),
            };
        }
        if self.is_protocol() {
            return self;
        }
        let message = self.to_string();
        let data = json!({
            "cause": format!("{:?}", self),
            "kind": self.variant_name(),
        });
        CoreError::Internal {
            message,
            data: Some(data),
        }
    }

    /// Attach a diagnostic key to an `Internal` error's data object.
    ///
    /// No-op for every other variant.
    pub fn with_diagnostic(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let CoreError::InSession { session_id, source } = self {
            return CoreError::InSession {
                session_id,
                source: Box::new(source.with_diagnostic(key, value)),
            };
        }
        if let CoreError::Internal { data, .. } = &mut self {
            let obj = data.get_or_insert_with(|| Value::Object(Map::new()));
            if !obj.is_object() {
                *obj = json!({ "detail": obj.clone() });
            }
            if let Some(map) = obj.as_object_mut() {
                map.insert(key.to_string(), value.into());
            }
        }
        self
    }

    /// Render as the structured object sent to the orchestrator.
    pub fn to_protocol(&self) -> ProtocolError {
        if let CoreError::InSession { session_id, source } = self {
            let mut protocol = source.to_protocol();
            let data = protocol
                .data
                .get_or_insert_with(|| Value::Object(Map::new()));
            if !data.is_object() {
                *data = json!({ "detail": data.clone() });
            }
            if let Some(map) = data.as_object_mut() {
                map.insert("sessionId".to_string(), Value::String(session_id.clone()));
            }
            return protocol;
        }
        let data = match self {
            CoreError::Validation(v) => serde_json::to_value(&v.issues)
                .ok()
                .map(|issues| json!({ "issues": issues })),
            CoreError::Internal { data, .. } => data.clone(),
            _ => None,
        };
        ProtocolError {
            code: self.code(),
            message: self.to_string(),
            data,
        }
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
