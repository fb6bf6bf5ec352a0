//! Audit event types and the event-name vocabulary.
//!
//! `EventDraft` is what a call site hands to the audit sink.  `AuditEvent` is
//! the signed, hash-chained row the sink persists.  `EventSummary` is the
//! trimmed view pushed to live observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured key/value payload attached to every event.
pub type EventContext = Map<String, Value>;

/// Event names written by the Sentinel backend.
pub mod names {
    pub const LOGIN_FAILED_LOCK_ACTIVE: &str = "login_failed_lock_active";
    pub const LOGIN_FAILED_WARN: &str = "login_failed_warn";
    pub const LOGIN_FAILED_TIMEOUT: &str = "login_failed_timeout";
    pub const LOGIN_FAILED_LOCK: &str = "login_failed_lock";
    pub const LOGIN_CREDENTIALS_OK: &str = "login_credentials_ok";
    pub const LOGIN_SUCCESS_PENDING_QR: &str = "login_success_pending_qr";
    pub const LOGIN_COMPLETED: &str = "login_completed";
    pub const LOGOUT: &str = "logout";

    pub const QR_SESSION_NOT_FOUND: &str = "qr_session_not_found";
    pub const QR_SESSION_EXPIRED: &str = "qr_session_expired";
    pub const QR_SESSION_CLOSED: &str = "qr_session_closed";
    pub const QR_SCANNED_FAIL: &str = "qr_scanned_fail";
    pub const QR_SCANNED_MISMATCH: &str = "qr_scanned_mismatch";
    pub const QR_SCANNED_OK: &str = "qr_scanned_ok";
    pub const QR_ASSIGNED: &str = "qr_assigned";
    pub const QR_REVOKED: &str = "qr_revoked";

    pub const NFC_SCAN_DENIED: &str = "nfc_scan_denied";
    pub const NFC_SCAN_GRANTED: &str = "nfc_scan_granted";
    pub const NFC_CARD_ASSIGNED: &str = "nfc_card_assigned";

    pub const ACCESS_GRANTED: &str = "access_granted";
    pub const ACCESS_DENIED: &str = "access_denied";
    pub const ACCESS_ATTEMPT: &str = "access_attempt";
    pub const AUTHORIZATION_DENIED: &str = "authorization_denied";
    pub const USER_REVOKED: &str = "user_revoked";
}

/// Event origin tags used as `source`.
pub mod sources {
    pub const AUTH_API: &str = "auth_api";
    pub const QR_API: &str = "qr_api";
    pub const ADMIN_API: &str = "admin_api";
    pub const NFC_API: &str = "nfc_api";
    pub const UNKNOWN_DEVICE: &str = "unknown";
}

/// An event as requested by a call site, before sanitizing and signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub event_name: String,
    pub actor_uid: Option<String>,
    pub source: Option<String>,
    pub context: EventContext,
}

impl EventDraft {
    /// Start a draft with no actor, source or context.
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            actor_uid: None,
            source: None,
            context: EventContext::new(),
        }
    }

    pub fn actor(mut self, uid: impl Into<String>) -> Self {
        self.actor_uid = Some(uid.into());
        self
    }

    /// Set the actor only when one is known.
    pub fn maybe_actor(mut self, uid: Option<&str>) -> Self {
        self.actor_uid = uid.map(str::to_string);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add one context field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// One signed, hash-chained entry of the audit log.
///
/// Immutable once persisted.  `hash_prev` is
/// `hex(SHA-256(previous.hash_prev || canonical_payload || signature))`, so
/// recomputing it from the preceding event detects retroactive edits,
/// reordering and deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Monotonic id assigned by the store; defines the chain order.
    pub id: u64,

    /// Time the store accepted the event.
    pub timestamp: DateTime<Utc>,

    pub event_name: String,
    pub actor_uid: Option<String>,
    pub source: Option<String>,

    /// Sanitized context.  Never null; empty map when nothing was supplied.
    pub context: EventContext,

    /// Base64 Ed25519 signature over the canonical payload.
    pub signature: String,

    /// Hex SHA-256 chaining this event to its predecessor.
    pub hash_prev: String,
}

impl AuditEvent {
    /// The trimmed view pushed to live observers.
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            event: self.event_name.clone(),
            actor_uid: self.actor_uid.clone(),
            source: self.source.clone(),
            ts: self.timestamp,
            context: self.context.clone(),
        }
    }
}

/// Live-feed payload for dashboards and SSE-style consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: u64,
    pub event: String,
    pub actor_uid: Option<String>,
    pub source: Option<String>,
    pub ts: DateTime<Utc>,
    pub context: EventContext,
}
