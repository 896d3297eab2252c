//! Router Settings
//!
//! Router configuration data structures, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Upper bound for `handoff.max_depth`.
pub const MAX_HANDOFF_DEPTH: usize = 16;

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Tenant (vault/workspace host) discriminator appended to tool names
    pub tenant: String,
    pub schema: SchemaSettings,
    pub session: SessionSettings,
    pub handoff: HandoffSettings,
    pub dispatch: DispatchSettings,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            tenant: "default".to_string(),
            schema: SchemaSettings::default(),
            session: SessionSettings::default(),
            handoff: HandoffSettings::default(),
            dispatch: DispatchSettings::default(),
        }
    }
}

/// How union constructs (`oneOf`/`anyOf`/`allOf`) inside an operation schema
/// end up in the unified provider schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionPolicy {
    /// Keep unions as mode-keyed conditional branches (strict)
    #[default]
    Conditional,
    /// Collapse each union to its most permissive branch (client compatibility)
    Flatten,
}

/// Which definition wins when two operations declare the same property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    #[default]
    LastWins,
    FirstWins,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    pub union_policy: UnionPolicy,
    pub collision_policy: CollisionPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Map a non-standard session name back to the id issued for it earlier
    pub retain_aliases: bool,
}

/// Execution strategy for multi-directive handoffs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainExecution {
    /// One directive at a time, in supplied order
    #[default]
    Sequential,
    /// All directives at once; results still reported in supplied order
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffSettings {
    pub execution: ChainExecution,
    /// How many levels of nested handoffs (a handoff result carrying its own
    /// handoff) are followed. 0 follows only the top-level directive.
    pub max_depth: usize,
    /// Validate handoff parameters against the target provider's schema
    pub validate_params: bool,
}

impl Default for HandoffSettings {
    fn default() -> Self {
        Self {
            execution: ChainExecution::Sequential,
            max_depth: 3,
            validate_params: true,
        }
    }
}

/// Fields an operation needs beyond what its generic schema enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRule {
    pub provider: String,
    pub operation: String,
    /// Parameter names that must be present and non-empty
    pub fields: Vec<String>,
}

impl DispatchRule {
    pub fn new(provider: &str, operation: &str, fields: &[&str]) -> Self {
        Self {
            provider: provider.to_string(),
            operation: operation.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Seed the dispatcher with the built-in content rules
    pub include_default_rules: bool,
    pub rules: Vec<DispatchRule>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            include_default_rules: true,
            rules: Vec::new(),
        }
    }
}

impl RouterConfig {
    /// Parse a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(text: &str) -> AppResult<Self> {
        let config: RouterConfig = toml::from_str(text)
            .map_err(|e| AppError::config(format!("Failed to parse router config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Tenant name as used in tool names.
    pub fn tenant_slug(&self) -> String {
        sanitize_tenant(&self.tenant)
    }

    /// Validate the configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.handoff.max_depth > MAX_HANDOFF_DEPTH {
            return Err(AppError::config(format!(
                "handoff.max_depth cannot exceed {} (got {})",
                MAX_HANDOFF_DEPTH, self.handoff.max_depth
            )));
        }

        for (index, rule) in self.dispatch.rules.iter().enumerate() {
            if rule.provider.trim().is_empty() || rule.operation.trim().is_empty() {
                return Err(AppError::config(format!(
                    "dispatch.rules[{}] needs both provider and operation",
                    index
                )));
            }
            if rule.fields.is_empty() || rule.fields.iter().any(|f| f.trim().is_empty()) {
                return Err(AppError::config(format!(
                    "dispatch.rules[{}] ({}.{}) must list at least one non-empty field",
                    index, rule.provider, rule.operation
                )));
            }
        }

        Ok(())
    }
}

/// Normalize a tenant name for use in protocol tool names.
///
/// Lowercases, replaces anything outside `[a-z0-9_-]` with `-`, collapses
/// repeated separators and trims them from the edges. Empty input yields
/// `default`.
pub fn sanitize_tenant(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars().flat_map(char::to_lowercase) {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            ch
        } else {
            '-'
        };
        if mapped == '-' && out.ends_with('-') {
            continue;
        }
        out.push(mapped);
    }
    let trimmed = out.trim_matches(|c| c == '-' || c == '_');
    if trimmed.is_empty() {
        "default".to_string()
    } else {
        trimmed.to_string()
    }
}
