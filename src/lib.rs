//! Nexus Router
//!
//! Protocol-facing capability router. Exposes capability providers to an
//! external orchestrator over JSON-RPC:
//! - one unified, `mode`-keyed parameter schema per provider
//! - session ids standardized on first contact, with one-time instructions
//! - workspace context carried across calls per session
//! - validated dispatch with field-level error hints
//! - single and chained handoffs between providers

pub mod models;
pub mod services;
pub mod utils;

pub use nexus_router_core::{CoreError, CoreResult, ErrorCode, WorkspaceContext};
pub use nexus_router_tools::{
    CapabilityProvider, FunctionOperation, Handoff, HandoffDirective, ModeHelp, Operation,
    OperationResult, ProviderRegistry, StaticProvider,
};

pub use models::{
    ChainExecution, CollisionPolicy, DispatchRule, JsonRpcRequest, JsonRpcResponse, RouterConfig,
    ToolCallResponse, UnionPolicy,
};
pub use services::{Router, RouterBuilder, SessionContextStore, SessionInfo};
pub use utils::error::{AppError, AppResult};
