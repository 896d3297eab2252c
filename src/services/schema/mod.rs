//! Unified Provider Schemas
//!
//! - `composer` - one schema per provider, keyed on `mode`
//! - `sanitize` - property cleanup for the flatten union policy
//! - `catalog` - composed schemas cached per provider

pub mod catalog;
pub mod composer;
pub mod sanitize;

pub use catalog::SchemaCatalog;
pub use composer::{SchemaComposer, MODE_KEY, SESSION_ID_KEY};
pub use sanitize::sanitize_property;
