//! Operation / Provider Traits and Registry
//!
//! Defines the `Operation` trait (one invokable mode), the
//! `CapabilityProvider` trait (a named bundle of operations), and the
//! `ProviderRegistry` used by the router for lookup and listing.
//!
//! Optional provider capabilities are typed: a provider that can render its
//! own help text returns `Some(&dyn ModeHelp)` from `mode_help()`. Providers
//! without the capability return `None` by default.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use nexus_router_core::{CoreResult, OperationContext};

use crate::executor::OperationResult;

/// One invokable function of a provider.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Slug, unique within the owning provider (e.g. "createContent")
    fn slug(&self) -> &str;

    /// Human-readable description of what this operation does
    fn description(&self) -> &str;

    /// JSON schema describing the operation's parameters.
    ///
    /// `mode` and `sessionId` are owned by the router and stripped during
    /// schema composition if declared here.
    fn parameters_schema(&self) -> Value;

    /// Execute with validated, context-enriched parameters.
    async fn execute(&self, ctx: &OperationContext, params: Value) -> CoreResult<OperationResult>;
}

/// Optional capability: provider-authored help text per mode.
pub trait ModeHelp: Send + Sync {
    /// Help for `slug`, or `None` to fall back to generated help.
    fn help(&self, slug: &str) -> Option<String>;
}

/// A named bundle of operations exposed to the orchestrator.
pub trait CapabilityProvider: Send + Sync {
    /// Unique provider name (e.g. "contentManager")
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Operations in declaration order.
    fn operations(&self) -> Vec<Arc<dyn Operation>>;

    /// Look up one operation by slug.
    fn operation(&self, slug: &str) -> Option<Arc<dyn Operation>> {
        self.operations().into_iter().find(|op| op.slug() == slug)
    }

    fn mode_help(&self) -> Option<&dyn ModeHelp> {
        None
    }
}

// ── FunctionOperation ────────────────────────────────────────────────

/// Boxed future returned by an operation handler.
pub type OperationFuture<'a> =
    Pin<Box<dyn Future<Output = CoreResult<OperationResult>> + Send + 'a>>;

/// Type alias for the async handler used by `FunctionOperation`.
pub type OperationHandler =
    Box<dyn Fn(&OperationContext, Value) -> OperationFuture<'_> + Send + Sync>;

/// An operation created from an async closure.
///
/// # Example
///
/// ```ignore
/// let op = FunctionOperation::new(
///     "readContent",
///     "Read a note",
///     json!({
///         "type": "object",
///         "properties": {"filePath": {"type": "string"}},
///         "required": ["filePath"]
///     }),
///     |_ctx, params| Box::pin(async move {
///         Ok(OperationResult::ok(params["filePath"].clone()))
///     }),
/// );
/// ```
pub struct FunctionOperation {
    slug: String,
    description: String,
    schema: Value,
    handler: OperationHandler,
}

impl FunctionOperation {
    pub fn new<F>(
        slug: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(&OperationContext, Value) -> OperationFuture<'_> + Send + Sync + 'static,
    {
        Self {
            slug: slug.into(),
            description: description.into(),
            schema,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl Operation for FunctionOperation {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, ctx: &OperationContext, params: Value) -> CoreResult<OperationResult> {
        (self.handler)(ctx, params).await
    }
}

// ── StaticProvider ───────────────────────────────────────────────────

/// A provider assembled from a fixed list of operations.
pub struct StaticProvider {
    name: String,
    description: String,
    operations: Vec<Arc<dyn Operation>>,
    help: Option<Arc<dyn ModeHelp>>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            operations: Vec::new(),
            help: None,
        }
    }

    /// Add an operation. An operation with the same slug is replaced in place.
    pub fn with_operation(mut self, operation: Arc<dyn Operation>) -> Self {
        match self
            .operations
            .iter()
            .position(|op| op.slug() == operation.slug())
        {
            Some(index) => self.operations[index] = operation,
            None => self.operations.push(operation),
        }
        self
    }

    pub fn with_help(mut self, help: Arc<dyn ModeHelp>) -> Self {
        self.help = Some(help);
        self
    }
}

impl CapabilityProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn operations(&self) -> Vec<Arc<dyn Operation>> {
        self.operations.clone()
    }

    fn operation(&self, slug: &str) -> Option<Arc<dyn Operation>> {
        self.operations.iter().find(|op| op.slug() == slug).cloned()
    }

    fn mode_help(&self) -> Option<&dyn ModeHelp> {
        self.help.as_deref()
    }
}

// ── ProviderRegistry ─────────────────────────────────────────────────

/// Registry of capability providers.
///
/// O(1) lookup by name with deterministic registration-order iteration.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn CapabilityProvider>>,
    /// Insertion order for deterministic iteration
    order: Vec<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a provider. A provider with the same name is replaced.
    pub fn register(&mut self, provider: Arc<dyn CapabilityProvider>) {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            tracing::warn!("[ProviderRegistry] Replacing provider '{}'", name);
        } else {
            self.order.push(name.clone());
        }
        self.providers.insert(name, provider);
    }

    /// Unregister a provider by name. Returns the removed provider, or None.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn CapabilityProvider>> {
        self.order.retain(|n| n != name);
        self.providers.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CapabilityProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Provider names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Providers in registration order.
    pub fn providers(&self) -> Vec<Arc<dyn CapabilityProvider>> {
        self.order
            .iter()
            .filter_map(|name| self.providers.get(name))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Protocol tool name for a provider: `<provider>_<tenant>`.
    pub fn tool_name(provider: &str, tenant: &str) -> String {
        format!("{}_{}", provider, tenant)
    }

    /// Resolve a protocol tool name to a provider.
    ///
    /// Accepts `<provider>_<tenant>` or a bare provider name.
    pub fn resolve(&self, tool_name: &str, tenant: &str) -> Option<Arc<dyn CapabilityProvider>> {
        let suffix = format!("_{}", tenant);
        if let Some(base) = tool_name.strip_suffix(&suffix) {
            if let Some(provider) = self.get(base) {
                return Some(provider);
            }
        }
        self.get(tool_name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
