//! Schema Catalog
//!
//! Composed schemas for every registered provider, computed once when the
//! provider is added.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use nexus_router_tools::{CapabilityProvider, ProviderRegistry};

use super::composer::SchemaComposer;

pub struct SchemaCatalog {
    composer: SchemaComposer,
    schemas: HashMap<String, Arc<Value>>,
}

impl SchemaCatalog {
    pub fn new(composer: SchemaComposer) -> Self {
        Self {
            composer,
            schemas: HashMap::new(),
        }
    }

    /// Compose the schema of every provider in `registry`.
    pub fn from_registry(composer: SchemaComposer, registry: &ProviderRegistry) -> Self {
        let mut catalog = Self::new(composer);
        for provider in registry.providers() {
            catalog.insert(provider.as_ref());
        }
        catalog
    }

    /// Compose and store `provider`'s schema, replacing any previous one.
    pub fn insert(&mut self, provider: &dyn CapabilityProvider) -> Arc<Value> {
        let schema = Arc::new(self.composer.compose(provider));
        self.schemas
            .insert(provider.name().to_string(), Arc::clone(&schema));
        schema
    }

    pub fn remove(&mut self, provider_name: &str) -> Option<Arc<Value>> {
        self.schemas.remove(provider_name)
    }

    pub fn get(&self, provider_name: &str) -> Option<Arc<Value>> {
        self.schemas.get(provider_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn composer(&self) -> &SchemaComposer {
        &self.composer
    }
}
