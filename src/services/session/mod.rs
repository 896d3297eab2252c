//! Sessions
//!
//! Session context persistence and session id standardization.

pub mod store;
pub mod validator;

pub use store::SessionContextStore;
pub use validator::{SessionIdValidator, SessionInfo};
