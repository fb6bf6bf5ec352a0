//! Policy rule types and configuration schema.
//!
//! A `PolicyConfig` is deserialized from TOML and holds an ordered list of
//! `PolicyRule`s.  Rules are evaluated in declaration order; the first
//! matching rule wins.  If no rule matches, the engine denies by default.

use serde::{Deserialize, Serialize};

/// The decision a rule produces when it matches.
///
/// ```toml
/// verdict = "allow"
/// verdict = "deny"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleVerdict {
    Allow,
    Deny,
}

/// A single policy rule loaded from TOML.
///
/// `action` and `resource` are exact strings, `"*"` for anything, or a
/// prefix ending in `*` (`"credentials:*"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Stable identifier used in deny reasons and logs.
    pub id: String,

    #[serde(default)]
    pub description: String,

    pub action: String,

    pub resource: String,

    /// Role codes allowed through this rule.  Empty means every role.
    ///
    /// A matching rule whose list does not contain the caller's role denies,
    /// even when its verdict is `allow`.
    #[serde(default)]
    pub roles: Vec<String>,

    pub verdict: RuleVerdict,

    pub deny_reason: Option<String>,
}

fn pattern_matches(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

impl PolicyRule {
    pub fn matches(&self, action: &str, resource: &str) -> bool {
        pattern_matches(&self.action, action) && pattern_matches(&self.resource, resource)
    }

    pub fn admits_role(&self, role: &str) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| r == role)
    }
}

/// The top-level structure of a policy file.
///
/// ```toml
/// [[rules]]
/// id = "logs-read"
/// description = "The signed event log is readable by monitors"
/// action = "logs:read"
/// resource = "*"
/// roles = ["R-ADM", "R-MON"]
/// verdict = "allow"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[cfg(test)]
mod tests {
    use super::pattern_matches;

    #[test]
    fn patterns() {
        assert!(pattern_matches("*", "anything"));
        assert!(pattern_matches("credentials:*", "credentials:assign_qr"));
        assert!(!pattern_matches("credentials:*", "users:list"));
        assert!(pattern_matches("logs:read", "logs:read"));
        assert!(!pattern_matches("logs:read", "logs:reader"));
    }
}
