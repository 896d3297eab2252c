//! Utilities
//!
//! Common utilities used throughout the router.

pub mod error;

pub use error::*;
