//! Request Strategies
//!
//! One strategy per request kind. The router walks its ordered list and the
//! first strategy whose `can_handle` accepts the method serves the request.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use nexus_router_core::{CoreError, CoreResult};
use nexus_router_tools::ProviderRegistry;

use super::help::{mode_help, provider_help};
use super::RouterContext;
use crate::models::{
    ReadResourceParams, ToolCallParams, ToolCallResponse, ToolDescriptor, ToolHelpParams,
};
use crate::services::schema::{MODE_KEY, SESSION_ID_KEY};
use crate::services::session::SessionInfo;
use crate::services::validation::ParameterValidator;

#[async_trait]
pub trait RequestStrategy: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &str;

    fn can_handle(&self, method: &str) -> bool;

    async fn handle(&self, ctx: &RouterContext, params: Value) -> CoreResult<Value>;
}

fn parse_params<T: DeserializeOwned>(method: &str, params: Value) -> CoreResult<T> {
    serde_json::from_value(params)
        .map_err(|e| CoreError::invalid_params(format!("Invalid {} params: {}", method, e)))
}

fn to_value<T: serde::Serialize>(value: &T) -> CoreResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// The strategies every router starts with, in matching order.
pub fn default_strategies() -> Vec<Box<dyn RequestStrategy>> {
    vec![
        Box::new(ToolListStrategy),
        Box::new(ToolCallStrategy),
        Box::new(ToolHelpStrategy),
        Box::new(ResourceListStrategy),
        Box::new(ResourceReadStrategy),
        Box::new(PromptListStrategy),
    ]
}

// ============================================================================
// tools/*
// ============================================================================

pub struct ToolListStrategy;

impl ToolListStrategy {
    pub fn descriptors(ctx: &RouterContext) -> Vec<ToolDescriptor> {
        ctx.registry
            .providers()
            .into_iter()
            .filter_map(|provider| {
                let schema = ctx.catalog.get(provider.name())?;
                Some(ToolDescriptor {
                    name: ProviderRegistry::tool_name(provider.name(), &ctx.tenant),
                    description: provider.description().to_string(),
                    input_schema: schema.as_ref().clone(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl RequestStrategy for ToolListStrategy {
    fn name(&self) -> &str {
        "tools/list"
    }

    fn can_handle(&self, method: &str) -> bool {
        method == "tools/list"
    }

    async fn handle(&self, ctx: &RouterContext, _params: Value) -> CoreResult<Value> {
        let tools = Self::descriptors(ctx);
        Ok(json!({ "tools": tools }))
    }
}

pub struct ToolCallStrategy;

impl ToolCallStrategy {
    /// Full tool-call pipeline: resolve, session, context, validate,
    /// execute, handoff, format.
    pub async fn call(
        ctx: &RouterContext,
        params: ToolCallParams,
    ) -> CoreResult<ToolCallResponse> {
        let provider = ctx
            .registry
            .resolve(&params.name, &ctx.tenant)
            .ok_or_else(|| CoreError::not_found(format!("Tool not found: {}", params.name)))?;
        let provider_name = provider.name().to_string();

        let mut arguments = params.arguments;
        let candidate = arguments
            .get(SESSION_ID_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        let session = ctx.validator.validate(candidate.as_deref());
        arguments.insert(SESSION_ID_KEY.to_string(), Value::String(session.id.clone()));

        // A caller whose id was just issued or replaced must learn it even
        // when this first call fails.
        Self::run(ctx, &provider_name, arguments, &session)
            .await
            .map_err(|e| {
                if session.is_new() {
                    e.in_session(&session.id)
                } else {
                    e
                }
            })
    }

    async fn run(
        ctx: &RouterContext,
        provider_name: &str,
        arguments: Map<String, Value>,
        session: &SessionInfo,
    ) -> CoreResult<ToolCallResponse> {
        let arguments = ctx.store.apply_to(&session.id, Value::Object(arguments));
        let schema = ctx.catalog.get(provider_name).ok_or_else(|| {
            CoreError::internal(format!("No composed schema for provider {}", provider_name))
        })?;
        let arguments = ParameterValidator::validate(arguments, &schema)?;
        let mode = arguments
            .get(MODE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CoreError::invalid_params("mode must be a string"))?;

        tracing::info!(
            session_id = %session.id,
            "[Router] tools/call {}.{}",
            provider_name,
            mode
        );

        let result = ctx
            .dispatcher
            .execute(provider_name, &mode, arguments, &session.id, 0)
            .await?;
        ctx.store.update_from_result(&session.id, &result);
        let result = ctx.handoffs.process(result, &session.id).await;

        Ok(ctx.formatter.format_execution_response(&result, session))
    }
}

#[async_trait]
impl RequestStrategy for ToolCallStrategy {
    fn name(&self) -> &str {
        "tools/call"
    }

    fn can_handle(&self, method: &str) -> bool {
        method == "tools/call"
    }

    async fn handle(&self, ctx: &RouterContext, params: Value) -> CoreResult<Value> {
        let params: ToolCallParams = parse_params("tools/call", params)?;
        let response = Self::call(ctx, params).await?;
        to_value(&response)
    }
}

pub struct ToolHelpStrategy;

#[async_trait]
impl RequestStrategy for ToolHelpStrategy {
    fn name(&self) -> &str {
        "tools/help"
    }

    fn can_handle(&self, method: &str) -> bool {
        method == "tools/help"
    }

    async fn handle(&self, ctx: &RouterContext, params: Value) -> CoreResult<Value> {
        let params: ToolHelpParams = parse_params("tools/help", params)?;
        let provider = ctx
            .registry
            .resolve(&params.name, &ctx.tenant)
            .ok_or_else(|| CoreError::not_found(format!("Tool not found: {}", params.name)))?;
        let tool_name = ProviderRegistry::tool_name(provider.name(), &ctx.tenant);

        let text = match params.mode.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(mode) => mode_help(provider.as_ref(), &tool_name, mode)?,
            None => provider_help(provider.as_ref(), &tool_name),
        };
        to_value(&ToolCallResponse::text(text))
    }
}

// ============================================================================
// resources/* and prompts/*
// ============================================================================

pub struct ResourceListStrategy;

#[async_trait]
impl RequestStrategy for ResourceListStrategy {
    fn name(&self) -> &str {
        "resources/list"
    }

    fn can_handle(&self, method: &str) -> bool {
        method == "resources/list"
    }

    async fn handle(&self, ctx: &RouterContext, _params: Value) -> CoreResult<Value> {
        let resources = match &ctx.resources {
            Some(source) => source.list_resources().await?,
            None => Vec::new(),
        };
        Ok(json!({ "resources": resources }))
    }
}

pub struct ResourceReadStrategy;

#[async_trait]
impl RequestStrategy for ResourceReadStrategy {
    fn name(&self) -> &str {
        "resources/read"
    }

    fn can_handle(&self, method: &str) -> bool {
        method == "resources/read"
    }

    async fn handle(&self, ctx: &RouterContext, params: Value) -> CoreResult<Value> {
        let params: ReadResourceParams = parse_params("resources/read", params)?;
        let source = ctx
            .resources
            .as_ref()
            .ok_or_else(|| CoreError::not_found(format!("Resource not found: {}", params.uri)))?;
        let contents = source.read_resource(&params.uri).await?;
        Ok(json!({ "contents": [contents] }))
    }
}

pub struct PromptListStrategy;

#[async_trait]
impl RequestStrategy for PromptListStrategy {
    fn name(&self) -> &str {
        "prompts/list"
    }

    fn can_handle(&self, method: &str) -> bool {
        method == "prompts/list"
    }

    async fn handle(&self, ctx: &RouterContext, _params: Value) -> CoreResult<Value> {
        let prompts = match &ctx.prompts {
            Some(source) => source.list_prompts().await?,
            None => Vec::new(),
        };
        Ok(json!({ "prompts": prompts }))
    }
}
