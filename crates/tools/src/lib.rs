//! Nexus Router Tools
//!
//! Operation-facing types and trait definitions for the Nexus capability
//! router:
//! - `OperationResult` - execution result, including handoff outcomes
//! - `HandoffDirective` / `Handoff` - continuation requests
//! - `Operation` / `CapabilityProvider` traits - unified provider interface
//! - `ProviderRegistry` - provider registration and name resolution
//! - `FunctionOperation` / `StaticProvider` - closure-based construction
//!
//! Schema composition, validation, and dispatch live in the main crate's
//! `services` module.

pub mod executor;
pub mod trait_def;

// Re-export core types
pub use executor::{Handoff, HandoffDirective, HandoffEntry, HandoffSummary, OperationResult};
pub use trait_def::{
    CapabilityProvider, FunctionOperation, ModeHelp, Operation, OperationFuture, OperationHandler,
    ProviderRegistry, StaticProvider,
};
