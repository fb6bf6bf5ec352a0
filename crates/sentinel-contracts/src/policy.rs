//! Authorization context and verdict types.
//!
//! The policy engine consumes a `PolicyContext` and produces a
//! `PolicyVerdict`.  Authorization is deny-by-default: anything other than
//! `Allow` refuses the action.

use serde::{Deserialize, Serialize};

/// The decision for a single role-gated action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyVerdict {
    Allow,
    Deny { reason: String },
}

impl PolicyVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Everything the policy engine needs to decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyContext {
    /// The requesting user.
    pub uid: String,
    /// The requesting user's role code.
    pub role: String,
    /// e.g. `users:list`, `logs:read`.
    pub action: String,
    /// e.g. `user/EMP-0002`, or `*` when not resource-specific.
    pub resource: String,
}
