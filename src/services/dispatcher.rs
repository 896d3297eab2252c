//! Capability Dispatcher
//!
//! Resolves a provider/operation pair, applies the operation-specific
//! field rules the generic schema cannot express, and executes it.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use nexus_router_core::{
    CoreError, CoreResult, OperationContext, WorkspaceContext, WORKSPACE_CONTEXT_KEY,
};
use nexus_router_tools::{OperationResult, ProviderRegistry};

use crate::models::{DispatchRule, DispatchSettings};

/// Built-in rules for the well-known content operations.
pub fn default_rules() -> Vec<DispatchRule> {
    vec![
        DispatchRule::new("contentManager", "createContent", &["filePath", "content"]),
        DispatchRule::new(
            "contentManager",
            "replaceContent",
            &["filePath", "oldContent", "newContent"],
        ),
    ]
}

pub struct CapabilityDispatcher {
    registry: Arc<ProviderRegistry>,
    /// `(provider, operation)` -> fields that must be present and non-empty
    rules: HashMap<(String, String), Vec<String>>,
}

impl CapabilityDispatcher {
    pub fn new(registry: Arc<ProviderRegistry>, settings: &DispatchSettings) -> Self {
        let mut dispatcher = Self {
            registry,
            rules: HashMap::new(),
        };
        if settings.include_default_rules {
            for rule in default_rules() {
                dispatcher.add_rule(rule);
            }
        }
        for rule in &settings.rules {
            dispatcher.add_rule(rule.clone());
        }
        dispatcher
    }

    /// Add a rule. Fields accumulate when the pair already has one.
    pub fn add_rule(&mut self, rule: DispatchRule) {
        let fields = self
            .rules
            .entry((rule.provider, rule.operation))
            .or_default();
        for field in rule.fields {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Execute `provider.operation` with already validated params.
    ///
    /// `handoff_depth` is 0 for direct calls and grows by one for each
    /// handoff level.
    pub async fn execute(
        &self,
        provider_name: &str,
        operation_slug: &str,
        params: Value,
        session_id: &str,
        handoff_depth: usize,
    ) -> CoreResult<OperationResult> {
        let provider = self
            .registry
            .get(provider_name)
            .ok_or_else(|| CoreError::not_found(format!("Provider not found: {}", provider_name)))?;
        let operation = provider.operation(operation_slug).ok_or_else(|| {
            CoreError::not_found(format!(
                "Operation not found: {}.{}",
                provider_name, operation_slug
            ))
        })?;

        self.check_rules(provider_name, operation_slug, &params)?;

        let call_id = Uuid::new_v4().to_string();
        let workspace = params
            .get(WORKSPACE_CONTEXT_KEY)
            .and_then(|v| serde_json::from_value::<WorkspaceContext>(v.clone()).ok());
        let ctx = OperationContext::new(session_id, provider_name, operation_slug, call_id.clone())
            .with_workspace(workspace)
            .with_handoff_depth(handoff_depth);

        tracing::debug!(
            call_id = %call_id,
            session_id = %session_id,
            depth = handoff_depth,
            "[Dispatcher] Executing {}.{}",
            provider_name,
            operation_slug
        );

        match operation.execute(&ctx, params).await {
            Ok(result) => {
                tracing::debug!(
                    call_id = %call_id,
                    success = result.success,
                    "[Dispatcher] {}.{} finished",
                    provider_name,
                    operation_slug
                );
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(
                    call_id = %call_id,
                    "[Dispatcher] {}.{} failed: {}",
                    provider_name,
                    operation_slug,
                    e
                );
                Err(e
                    .into_protocol()
                    .with_diagnostic("provider", provider_name)
                    .with_diagnostic("operation", operation_slug)
                    .with_diagnostic("callId", call_id))
            }
        }
    }

    fn check_rules(&self, provider: &str, operation: &str, params: &Value) -> CoreResult<()> {
        let Some(fields) = self.rules.get(&(provider.to_string(), operation.to_string())) else {
            return Ok(());
        };
        let missing: Vec<&str> = fields
            .iter()
            .filter(|field| !is_filled(params.get(field.as_str())))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(CoreError::invalid_params(format!(
            "{}.{} requires non-empty: {}",
            provider,
            operation,
            missing.join(", ")
        )))
    }
}

fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}
