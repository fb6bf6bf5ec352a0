//! Login session records.
//!
//! A `LoginSession` is the window between a correct password and the QR scan
//! that must complete it.  Its state only moves forward: `Pending` can become
//! any terminal state, and terminal states never change again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a login session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Pending,
    Completed,
    Failed,
    Expired,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        *self == Self::Pending && next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One login attempt's QR completion window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginSession {
    /// Random opaque token (UUID v4).
    pub session_id: String,
    /// The user whose password was accepted.
    pub uid: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    /// `created_at + QR_TTL`.
    pub expires_at: DateTime<Utc>,
}

impl LoginSession {
    /// Open a pending session for `uid` valid for `ttl`.
    pub fn open(uid: impl Into<String>, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            uid: uid.into(),
            state: SessionState::Pending,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// True once `now` is strictly past `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
