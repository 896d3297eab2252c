//! Data Models
//!
//! Router configuration and protocol payload types.

pub mod protocol;
pub mod settings;

pub use protocol::*;
pub use settings::*;
