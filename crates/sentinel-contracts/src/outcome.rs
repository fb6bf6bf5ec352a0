//! Typed outcomes of the authentication flows.
//!
//! Every rejection is an explicit variant rather than an error so the route
//! layer can match exhaustively.  `status_code()` gives the HTTP-equivalent
//! status for each variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{session::SessionState, user::Role};

/// Result of the password step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoginOutcome {
    /// Password accepted; the caller must complete the session with a QR scan.
    PendingQr {
        session_id: String,
        expires_at: DateTime<Utc>,
        uid: String,
        role: Role,
    },

    /// The lockout key is already locked.  The attempt counter was not touched.
    Throttled { remaining_secs: i64, message: String },

    /// Wrong handle or password; more attempts remain before the lock.
    InvalidCredentials { attempts_remaining: u32, message: String },

    /// Wrong handle or password, and this failure engaged the lock.
    LockedOut { lock_secs: i64, message: String },
}

impl LoginOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PendingQr { .. } => 200,
            Self::Throttled { .. } | Self::LockedOut { .. } => 429,
            Self::InvalidCredentials { .. } => 401,
        }
    }

    /// Human-readable message for rejections; `None` on success.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::PendingQr { .. } => None,
            Self::Throttled { message, .. }
            | Self::InvalidCredentials { message, .. }
            | Self::LockedOut { message, .. } => Some(message),
        }
    }
}

/// Result of the QR step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanOutcome {
    /// The QR belongs to the session's user.  `token` is the long-lived
    /// session credential.
    Completed { uid: String, role: Role, token: String },

    SessionNotFound,

    /// The QR window elapsed before a valid scan.
    SessionExpired,

    /// The session already reached `state` and cannot be scanned again.
    SessionClosed { state: SessionState },

    /// The session user's lockout key is locked.
    Throttled { remaining_secs: i64, message: String },

    /// The value matches no active QR credential.
    HashMiss { attempt: u32 },

    /// The value is a valid QR of a different user.
    SessionUserMismatch {
        expected_uid: String,
        scanned_uid: String,
        attempt: u32,
    },
}

impl ScanOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Completed { .. } => 200,
            Self::SessionNotFound => 404,
            Self::SessionExpired => 400,
            Self::SessionClosed { .. } => 409,
            Self::Throttled { .. } => 429,
            Self::HashMiss { .. } => 401,
            Self::SessionUserMismatch { .. } => 403,
        }
    }

    /// Stable machine-readable reason for rejections.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Completed { .. } => None,
            Self::SessionNotFound => Some("session_not_found"),
            Self::SessionExpired => Some("session_expired"),
            Self::SessionClosed { .. } => Some("session_closed"),
            Self::Throttled { .. } => Some("throttled"),
            Self::HashMiss { .. } => Some("hash_miss"),
            Self::SessionUserMismatch { .. } => Some("session_user_mismatch"),
        }
    }
}

/// Result of a client-reported QR timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutOutcome {
    /// No such session; nothing was recorded.
    UnknownSession,
    /// The session is (now) expired and the timeout was recorded.
    Expired,
    /// The session had already reached another terminal state, which is kept.
    AlreadyFinal { state: SessionState },
}

/// Why an NFC tap was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NfcDenial {
    InvalidRequest,
    InvalidPassword,
    CardNotRegistered,
    UserInactive,
    CardRevoked,
}

impl NfcDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidPassword => "invalid_password",
            Self::CardNotRegistered => "card_not_registered",
            Self::UserInactive => "user_inactive",
            Self::CardRevoked => "card_revoked",
        }
    }
}

/// Result of an NFC tap at a reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NfcOutcome {
    Granted {
        uid: String,
        role: Role,
        access_level: String,
        event_id: u64,
    },
    Denied { reason: NfcDenial },
}

impl NfcOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Denied {
                reason: NfcDenial::InvalidRequest,
            } => 400,
            _ => 200,
        }
    }
}

/// Result recorded for a physical access attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessResult {
    Granted,
    Denied,
    Attempt,
}

impl AccessResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Attempt => "attempt",
        }
    }
}
