//! Handoff Orchestrator
//!
//! Continues execution into other providers when an operation's result
//! carries a handoff directive (or a list of them).
//!
//! Handoffs are best-effort: a failing directive becomes
//! `{success: false, error}` in the outcome and never fails the response.

use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};

use nexus_router_core::{CoreError, CoreResult, WorkspaceContext};
use nexus_router_tools::{Handoff, HandoffDirective, HandoffEntry, HandoffSummary, OperationResult};

use super::dispatcher::CapabilityDispatcher;
use super::schema::{SchemaCatalog, MODE_KEY, SESSION_ID_KEY};
use super::session::SessionContextStore;
use super::validation::ParameterValidator;
use crate::models::{ChainExecution, HandoffSettings};

pub struct HandoffOrchestrator {
    dispatcher: Arc<CapabilityDispatcher>,
    catalog: Arc<SchemaCatalog>,
    store: Arc<SessionContextStore>,
    settings: HandoffSettings,
}

impl HandoffOrchestrator {
    pub fn new(
        dispatcher: Arc<CapabilityDispatcher>,
        catalog: Arc<SchemaCatalog>,
        store: Arc<SessionContextStore>,
        settings: HandoffSettings,
    ) -> Self {
        Self {
            dispatcher,
            catalog,
            store,
            settings,
        }
    }

    /// Process the handoff carried by `original`, if any.
    ///
    /// Results without a handoff are returned unchanged.
    pub async fn process(&self, original: OperationResult, session_id: &str) -> OperationResult {
        self.process_at(original, session_id, 0).await
    }

    fn process_at<'a>(
        &'a self,
        original: OperationResult,
        session_id: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, OperationResult> {
        async move {
            let handoff = match original.handoff.clone() {
                Some(handoff) if !handoff.is_empty() => handoff,
                _ => return original,
            };
            match handoff {
                Handoff::Single(directive) => {
                    self.process_single(original, &directive, session_id, depth)
                        .await
                }
                Handoff::Multiple(directives) => {
                    self.process_multiple(original, &directives, session_id, depth)
                        .await
                }
            }
        }
        .boxed()
    }

    async fn process_single(
        &self,
        original: OperationResult,
        directive: &HandoffDirective,
        session_id: &str,
        depth: usize,
    ) -> OperationResult {
        tracing::info!(
            session_id = %session_id,
            depth = depth,
            "[Handoff] {}.{} (returnHere: {})",
            directive.target_provider,
            directive.target_operation,
            directive.return_here
        );

        let origin = original.workspace_context.clone();
        let result = self
            .follow(directive, origin.as_ref(), session_id, depth)
            .await;
        self.store.update_from_result(session_id, &result);

        if directive.return_here {
            OperationResult {
                handoff_result: Some(Box::new(result)),
                ..original
            }
        } else {
            result
        }
    }

    async fn process_multiple(
        &self,
        original: OperationResult,
        directives: &[HandoffDirective],
        session_id: &str,
        depth: usize,
    ) -> OperationResult {
        tracing::info!(
            session_id = %session_id,
            depth = depth,
            "[Handoff] Processing {} directives ({:?})",
            directives.len(),
            self.settings.execution
        );

        let origin = original.workspace_context.clone();
        let results: Vec<OperationResult> = match self.settings.execution {
            ChainExecution::Sequential => {
                let mut results = Vec::with_capacity(directives.len());
                for directive in directives {
                    results.push(
                        self.follow(directive, origin.as_ref(), session_id, depth)
                            .await,
                    );
                }
                results
            }
            ChainExecution::Concurrent => {
                join_all(
                    directives
                        .iter()
                        .map(|d| self.follow(d, origin.as_ref(), session_id, depth)),
                )
                .await
            }
        };

        let entries: Vec<HandoffEntry> = directives
            .iter()
            .zip(results)
            .enumerate()
            .map(|(sequence, (directive, result))| HandoffEntry::new(sequence, directive, result))
            .collect();

        // Only the last successful entry that carries a context updates the session.
        if let Some(entry) = entries
            .iter()
            .rev()
            .find(|e| e.result.success && e.result.workspace_context.is_some())
        {
            self.store.update_from_result(session_id, &entry.result);
        }

        let summary = HandoffSummary::from_entries(&entries);
        tracing::info!(
            "[Handoff] Chain finished: {} succeeded, {} failed",
            summary.success_count,
            summary.failure_count
        );

        if directives.iter().any(|d| d.return_here) {
            OperationResult {
                handoff_results: Some(entries),
                handoff_summary: Some(summary),
                ..original
            }
        } else {
            OperationResult {
                success: summary.failure_count == 0,
                handoff_results: Some(entries),
                handoff_summary: Some(summary),
                ..OperationResult::default()
            }
        }
    }

    /// Run one directive and any handoff its result carries, within the
    /// configured depth.
    fn follow<'a>(
        &'a self,
        directive: &'a HandoffDirective,
        origin: Option<&'a WorkspaceContext>,
        session_id: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, OperationResult> {
        async move {
            let level = depth + 1;
            let result = match self.run(directive, origin, session_id, level).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(
                        "[Handoff] {}.{} failed: {}",
                        directive.target_provider,
                        directive.target_operation,
                        e
                    );
                    return OperationResult::err(e.to_string());
                }
            };

            if result.handoff.is_none() {
                return result;
            }
            if level > self.settings.max_depth {
                tracing::warn!(
                    "[Handoff] Not following nested handoff from {}.{}: depth {} exceeds {}",
                    directive.target_provider,
                    directive.target_operation,
                    level,
                    self.settings.max_depth
                );
                return result;
            }
            self.process_at(result, session_id, level).await
        }
        .boxed()
    }

    async fn run(
        &self,
        directive: &HandoffDirective,
        origin: Option<&WorkspaceContext>,
        session_id: &str,
        level: usize,
    ) -> CoreResult<OperationResult> {
        let mut params = match &directive.parameters {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => {
                return Err(CoreError::invalid_params(
                    "Handoff parameters must be an object",
                ))
            }
        };

        if let Some(context) = origin {
            context.merge_into(&mut params);
        }
        params
            .entry(SESSION_ID_KEY)
            .or_insert_with(|| Value::String(session_id.to_string()));
        params.insert(
            MODE_KEY.to_string(),
            Value::String(directive.target_operation.clone()),
        );

        let mut params = self.store.apply_to(session_id, Value::Object(params));

        if self.settings.validate_params {
            if let Some(schema) = self.catalog.get(&directive.target_provider) {
                params = ParameterValidator::validate(params, &schema)?;
            }
        }

        self.dispatcher
            .execute(
                &directive.target_provider,
                &directive.target_operation,
                params,
                session_id,
                level,
            )
            .await
    }
}
