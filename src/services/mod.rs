//! Services
//!
//! The routing engine, in dependency order: schema composition, sessions,
//! parameter validation, dispatch, handoffs, response formatting, and the
//! request router on top.

pub mod dispatcher;
pub mod formatter;
pub mod handoff;
pub mod router;
pub mod schema;
pub mod session;
pub mod validation;

pub use dispatcher::{default_rules, CapabilityDispatcher};
pub use formatter::{instructions_banner, ResponseFormatter, SESSION_INSTRUCTIONS_KEY};
pub use handoff::HandoffOrchestrator;
pub use router::{
    PromptSource, RequestStrategy, ResourceSource, Router, RouterBuilder, RouterContext,
};
pub use schema::{SchemaCatalog, SchemaComposer};
pub use session::{SessionContextStore, SessionIdValidator, SessionInfo};
pub use validation::ParameterValidator;
