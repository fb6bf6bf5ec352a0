//! # sentinel-policy
//!
//! A TOML-driven, deny-by-default role policy for the Sentinel backend.
//!
//! [`TomlRolePolicy`] implements
//! [`PolicyEngine`](sentinel_core::traits::PolicyEngine).  Rules name an
//! action, a resource and the role codes they admit; the first matching rule
//! decides and anything unmatched is denied.
//!
//! ```rust,ignore
//! let policy = TomlRolePolicy::load(config.policy.path.as_deref())?;
//! let gate = AccessGate::new(deps, Arc::new(policy), audit_policy);
//! ```

pub mod engine;
pub mod rule;

pub use engine::TomlRolePolicy;
pub use rule::{PolicyConfig, PolicyRule, RuleVerdict};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use sentinel_contracts::{
        error::SentinelError,
        policy::{PolicyContext, PolicyVerdict},
        user::Role,
    };
    use sentinel_core::traits::PolicyEngine;

    use crate::TomlRolePolicy;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn ctx(role: &str, action: &str, resource: &str) -> PolicyContext {
        PolicyContext {
            uid: "EMP-0001".to_string(),
            role: role.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
        }
    }

    fn deny_reason(verdict: PolicyVerdict) -> String {
        match verdict {
            PolicyVerdict::Deny { reason } => reason,
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    // ── 1. deny-by-default ────────────────────────────────────────────────────

    #[test]
    fn test_deny_by_default() {
        let engine = TomlRolePolicy::from_toml_str("rules = []").unwrap();
        let reason = deny_reason(engine.evaluate(&ctx(Role::ADMIN, "users:list", "*")).unwrap());
        assert!(reason.contains("denied by default"), "got: {reason}");
    }

    // ── 2. role lists ─────────────────────────────────────────────────────────

    #[test]
    fn test_matched_rule_requires_listed_role() {
        let toml = r#"
            [[rules]]
            id = "logs-read"
            description = "Monitors read the log"
            action = "logs:read"
            resource = "*"
            roles = ["R-ADM", "R-MON"]
            verdict = "allow"
        "#;
        let engine = TomlRolePolicy::from_toml_str(toml).unwrap();

        assert_eq!(engine.evaluate(&ctx(Role::MONITOR, "logs:read", "*")).unwrap(), PolicyVerdict::Allow);
        let reason = deny_reason(engine.evaluate(&ctx(Role::EMPLOYEE, "logs:read", "*")).unwrap());
        assert!(reason.contains("R-EMP"), "deny reason should name the role: {reason}");
    }

    #[test]
    fn test_empty_role_list_admits_everyone() {
        let toml = r#"
            [[rules]]
            id = "self-profile"
            action = "profile:read"
            resource = "*"
            verdict = "allow"
        "#;
        let engine = TomlRolePolicy::from_toml_str(toml).unwrap();
        assert!(engine.evaluate(&ctx(Role::VISITOR, "profile:read", "user/EMP-0001")).unwrap().is_allowed());
    }

    // ── 3. explicit deny and first match ──────────────────────────────────────

    #[test]
    fn test_first_match_wins() {
        let toml = r#"
            [[rules]]
            id = "no-delete"
            action = "users:delete"
            resource = "*"
            verdict = "deny"
            deny_reason = "user records are revoked, not deleted"

            [[rules]]
            id = "admin-everything"
            action = "*"
            resource = "*"
            roles = ["R-ADM"]
            verdict = "allow"
        "#;
        let engine = TomlRolePolicy::from_toml_str(toml).unwrap();

        let reason = deny_reason(engine.evaluate(&ctx(Role::ADMIN, "users:delete", "user/X")).unwrap());
        assert_eq!(reason, "user records are revoked, not deleted");
        assert!(engine.evaluate(&ctx(Role::ADMIN, "users:update", "user/X")).unwrap().is_allowed());
    }

    // ── 4. built-in policy ────────────────────────────────────────────────────

    #[test]
    fn test_builtin_policy_roles() {
        let engine = TomlRolePolicy::builtin().unwrap();
        assert!(engine.rule_count() > 0);

        let allowed = |role: &str, action: &str| engine.evaluate(&ctx(role, action, "*")).unwrap().is_allowed();
        assert!(allowed(Role::IDENTITY_MANAGER, "users:list"));
        assert!(allowed(Role::IDENTITY_MANAGER, "credentials:assign_qr"));
        assert!(allowed(Role::AUDITOR, "logs:read"));
        assert!(allowed(Role::ACCESS_CONTROL, "access:last"));
        assert!(!allowed(Role::EMPLOYEE, "users:list"));
        assert!(!allowed(Role::MONITOR, "credentials:revoke_qr"));
        assert!(!allowed(Role::ADMIN, "users:delete"));
        assert!(!allowed(Role::ADMIN, "firmware:flash"), "unknown actions are denied");
    }

    // ── 5. errors ─────────────────────────────────────────────────────────────

    #[test]
    fn test_toml_parse_error() {
        match TomlRolePolicy::from_toml_str("this is not valid toml ][[[") {
            Err(SentinelError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse policy TOML"), "got: {reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = TomlRolePolicy::from_file(std::path::Path::new("/nonexistent/policy.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read policy file"), "got: {err}");
    }
}
