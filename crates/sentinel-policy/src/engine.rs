//! TOML-driven role policy engine.
//!
//! Evaluation algorithm:
//!
//! 1. Iterate rules in declaration order.
//! 2. For the first rule whose `action` and `resource` patterns match:
//!    a. If the rule lists `roles` and the caller's role is not among them,
//!       deny.
//!    b. Otherwise return the rule's verdict.
//! 3. If no rule matched, deny by default.

use std::path::Path;

use tracing::{debug, warn};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    policy::{PolicyContext, PolicyVerdict},
};
use sentinel_core::traits::PolicyEngine;

use crate::rule::{PolicyConfig, RuleVerdict};

const BUILTIN_POLICY: &str = include_str!("../policies/default.toml");

/// A `PolicyEngine` that reads its rules from a TOML document.
///
/// ```rust,ignore
/// let engine = TomlRolePolicy::from_file(Path::new("policies/sentinel.toml"))?;
/// ```
#[derive(Debug)]
pub struct TomlRolePolicy {
    config: PolicyConfig,
}

impl TomlRolePolicy {
    /// # Errors
    ///
    /// `ConfigError` if the TOML is malformed or does not match the schema.
    pub fn from_toml_str(s: &str) -> SentinelResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| SentinelError::ConfigError {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        debug!(rules = config.rules.len(), "role policy loaded");
        Ok(Self { config })
    }

    /// # Errors
    ///
    /// `ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> SentinelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SentinelError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The policy compiled into the crate.
    pub fn builtin() -> SentinelResult<Self> {
        Self::from_toml_str(BUILTIN_POLICY)
    }

    /// Load `path` when given, else the built-in policy.
    pub fn load(path: Option<&Path>) -> SentinelResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.config.rules.len()
    }
}

impl PolicyEngine for TomlRolePolicy {
    fn evaluate(&self, ctx: &PolicyContext) -> SentinelResult<PolicyVerdict> {
        debug!(
            uid = %ctx.uid,
            role = %ctx.role,
            action = %ctx.action,
            resource = %ctx.resource,
            "evaluating policy"
        );

        let Some(rule) = self
            .config
            .rules
            .iter()
            .find(|rule| rule.matches(&ctx.action, &ctx.resource))
        else {
            warn!(
                uid = %ctx.uid,
                action = %ctx.action,
                resource = %ctx.resource,
                "no policy rule matched; denying by default"
            );
            return Ok(PolicyVerdict::Deny {
                reason: format!(
                    "denied by default: no policy rule matched action '{}' on resource '{}'",
                    ctx.action, ctx.resource
                ),
            });
        };

        debug!(rule_id = %rule.id, "rule matched");

        if !rule.admits_role(&ctx.role) {
            return Ok(PolicyVerdict::Deny {
                reason: format!("rule '{}' does not admit role '{}'", rule.id, ctx.role),
            });
        }

        Ok(match rule.verdict {
            RuleVerdict::Allow => PolicyVerdict::Allow,
            RuleVerdict::Deny => PolicyVerdict::Deny {
                reason: rule
                    .deny_reason
                    .clone()
                    .unwrap_or_else(|| format!("denied by rule '{}'", rule.id)),
            },
        })
    }
}
