//! Request Router
//!
//! Top-level entry point. Owns the provider registry, composed schemas, the
//! session store, and the execution pipeline, and answers JSON-RPC requests
//! through an ordered list of `RequestStrategy` implementations.
//!
//! ```ignore
//! let router = Router::builder()
//!     .config(RouterConfig::load(path)?)
//!     .provider(Arc::new(content_manager))
//!     .build()?;
//! let response = router.handle_request(request).await;
//! ```

pub mod collaborators;
pub mod help;
pub mod strategy;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{Map, Value};

use nexus_router_core::{CoreError, CoreResult};
use nexus_router_tools::{CapabilityProvider, ProviderRegistry};

use super::dispatcher::CapabilityDispatcher;
use super::formatter::ResponseFormatter;
use super::handoff::HandoffOrchestrator;
use super::schema::{SchemaCatalog, SchemaComposer};
use super::session::{SessionContextStore, SessionIdValidator};
use crate::models::{
    JsonRpcRequest, JsonRpcResponse, RouterConfig, ToolCallParams, ToolCallResponse, ToolDescriptor,
    JSONRPC_VERSION,
};
use crate::utils::error::AppResult;

pub use collaborators::{PromptSource, ResourceSource};
pub use strategy::{default_strategies, RequestStrategy};

/// Shared state handed to every strategy.
pub struct RouterContext {
    pub tenant: String,
    pub registry: Arc<ProviderRegistry>,
    pub catalog: Arc<SchemaCatalog>,
    pub store: Arc<SessionContextStore>,
    pub validator: Arc<SessionIdValidator>,
    pub dispatcher: Arc<CapabilityDispatcher>,
    pub handoffs: HandoffOrchestrator,
    pub formatter: ResponseFormatter,
    pub resources: Option<Arc<dyn ResourceSource>>,
    pub prompts: Option<Arc<dyn PromptSource>>,
}

pub struct Router {
    ctx: RouterContext,
    strategies: Vec<Box<dyn RequestStrategy>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Answer one JSON-RPC request. Always returns an envelope: errors and
    /// operation panics become protocol errors.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        if request.jsonrpc != JSONRPC_VERSION {
            let err = CoreError::invalid_params(format!(
                "Unsupported jsonrpc version '{}', expected '{}'",
                request.jsonrpc, JSONRPC_VERSION
            ));
            return JsonRpcResponse::err(id, err.to_protocol());
        }

        let outcome = AssertUnwindSafe(self.handle(&request.method, request.params))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(result)) => JsonRpcResponse::ok(id, result),
            Ok(Err(e)) => {
                let e = e.into_protocol();
                tracing::debug!("[Router] {} failed: {}", request.method, e);
                JsonRpcResponse::err(id, e.to_protocol())
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("[Router] {} panicked: {}", request.method, detail);
                let err = CoreError::internal(format!("Request handler panicked: {}", detail))
                    .with_diagnostic("method", request.method.clone());
                JsonRpcResponse::err(id, err.to_protocol())
            }
        }
    }

    /// Dispatch `method` to the first strategy that accepts it.
    pub async fn handle(&self, method: &str, params: Value) -> CoreResult<Value> {
        let strategy = self
            .strategies
            .iter()
            .find(|s| s.can_handle(method))
            .ok_or_else(|| CoreError::not_found(format!("Method not found: {}", method)))?;
        tracing::debug!("[Router] {} -> {}", method, strategy.name());
        strategy.handle(&self.ctx, params).await
    }

    /// `tools/list` without the envelope.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        strategy::ToolListStrategy::descriptors(&self.ctx)
    }

    /// `tools/call` without the envelope.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> CoreResult<ToolCallResponse> {
        strategy::ToolCallStrategy::call(
            &self.ctx,
            ToolCallParams {
                name: name.to_string(),
                arguments,
            },
        )
        .await
    }

    pub fn tenant(&self) -> &str {
        &self.ctx.tenant
    }

    pub fn session_store(&self) -> &Arc<SessionContextStore> {
        &self.ctx.store
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.ctx.registry
    }

    /// Composed schema of one provider.
    pub fn schema_for(&self, provider_name: &str) -> Option<Arc<Value>> {
        self.ctx.catalog.get(provider_name)
    }

    /// Tear down session state.
    pub fn shutdown(&self) {
        tracing::info!("[Router] Shutting down");
        self.ctx.store.clear_all();
    }
}

pub struct RouterBuilder {
    config: RouterConfig,
    registry: ProviderRegistry,
    store: Option<Arc<SessionContextStore>>,
    resources: Option<Arc<dyn ResourceSource>>,
    prompts: Option<Arc<dyn PromptSource>>,
    strategies: Vec<Box<dyn RequestStrategy>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            registry: ProviderRegistry::new(),
            store: None,
            resources: None,
            prompts: None,
            strategies: Vec::new(),
        }
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.registry.register(provider);
        self
    }

    /// Use an existing registry; providers added before this call are dropped.
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Share an existing session store instead of creating one.
    pub fn session_store(mut self, store: Arc<SessionContextStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn resources(mut self, source: Arc<dyn ResourceSource>) -> Self {
        self.resources = Some(source);
        self
    }

    pub fn prompts(mut self, source: Arc<dyn PromptSource>) -> Self {
        self.prompts = Some(source);
        self
    }

    /// Add a strategy. Added strategies are consulted before the defaults.
    pub fn strategy(mut self, strategy: Box<dyn RequestStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn build(self) -> AppResult<Router> {
        self.config.validate()?;
        let tenant = self.config.tenant_slug();

        let registry = Arc::new(self.registry);
        let catalog = Arc::new(SchemaCatalog::from_registry(
            SchemaComposer::new(self.config.schema),
            &registry,
        ));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(SessionContextStore::new()));
        let validator = Arc::new(SessionIdValidator::new(
            Arc::clone(&store),
            self.config.session.retain_aliases,
        ));
        let dispatcher = Arc::new(CapabilityDispatcher::new(
            Arc::clone(&registry),
            &self.config.dispatch,
        ));
        let handoffs = HandoffOrchestrator::new(
            Arc::clone(&dispatcher),
            Arc::clone(&catalog),
            Arc::clone(&store),
            self.config.handoff,
        );
        let formatter = ResponseFormatter::new(Arc::clone(&validator), Arc::clone(&store));

        let mut strategies = self.strategies;
        strategies.extend(default_strategies());

        tracing::info!(
            "[Router] Built for tenant '{}' with {} providers",
            tenant,
            registry.len()
        );

        Ok(Router {
            ctx: RouterContext {
                tenant,
                registry,
                catalog,
                store,
                validator,
                dispatcher,
                handoffs,
                formatter,
                resources: self.resources,
                prompts: self.prompts,
            },
            strategies,
        })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
