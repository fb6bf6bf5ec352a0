//! Collaborator trait definitions for the Sentinel authentication core.
//!
//! These traits define the boundary between the protocol logic in this
//! crate and the plumbing it does not own:
//!
//! - `AuditSink` : trusted sink (signs, chains and persists events)
//! - `UserDirectory` : user records and credential status
//! - `SessionStore` : login sessions with monotonic state transitions
//! - `PasswordVerifier`, `QrVerifier`, `CardHasher` : opaque secret checks
//! - `TokenIssuer` : long-lived session credentials
//! - `PolicyEngine` : role-based authorization
//!
//! `LoginProtocol`, `AccessGate` and `CredentialAdmin` receive them bundled
//! in a [`Collaborators`] value built by the composition root.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use sentinel_contracts::{
    error::SentinelResult,
    event::{AuditEvent, EventDraft},
    policy::{PolicyContext, PolicyVerdict},
    session::{LoginSession, SessionState},
    user::{Role, UserRecord},
};

use crate::{attempts::AttemptTracker, clock::Clock};

/// The audit sink: the tamper-evident security record.
///
/// Each call performs exactly one durable write.  Whether a failed append
/// aborts the triggering action is decided by the caller's
/// [`AuditPolicy`](crate::audit_policy::AuditPolicy), not by the sink.
pub trait AuditSink: Send + Sync {
    /// Sanitize, sign, chain and persist one event.
    fn append(&self, draft: EventDraft) -> SentinelResult<AuditEvent>;
}

/// Read/write access to user records.
pub trait UserDirectory: Send + Sync {
    fn find_by_uid(&self, uid: &str) -> SentinelResult<Option<UserRecord>>;

    /// Look up by login handle.  Implementations compare normalized handles.
    fn find_by_handle(&self, handle: &str) -> SentinelResult<Option<UserRecord>>;

    /// Look up by the SHA-256 digest of an NFC card UID.
    fn find_by_nfc_hash(&self, nfc_uid_hash: &str) -> SentinelResult<Option<UserRecord>>;

    /// All users in a stable order.
    fn list(&self) -> SentinelResult<Vec<UserRecord>>;

    /// Insert or replace the record keyed by `user.uid`.
    fn save(&self, user: UserRecord) -> SentinelResult<()>;

    /// Stamp `last_access` on the stored record, leaving every other field
    /// as it is now.  Returns `Ok(false)` when the user does not exist.
    fn touch_last_access(&self, uid: &str, at: DateTime<Utc>) -> SentinelResult<bool>;
}

/// Storage for login sessions.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: LoginSession) -> SentinelResult<()>;

    fn get(&self, session_id: &str) -> SentinelResult<Option<LoginSession>>;

    /// Move a pending session to `next`.
    ///
    /// The check and the write must be atomic.  Returns `Ok(false)` without
    /// changing anything when the session is missing or already terminal.
    fn transition(&self, session_id: &str, next: SessionState) -> SentinelResult<bool>;
}

/// Opaque password check.
pub trait PasswordVerifier: Send + Sync {
    /// Never panics and never errors: malformed hashes verify as `false`.
    fn verify(&self, password: &str, stored_hash: &str) -> bool;
}

/// QR secret lifecycle: generation, storage hash, verification, fingerprint.
pub trait QrVerifier: Send + Sync {
    /// A fresh random value in a printable alphabet.
    fn generate_value(&self) -> String;

    /// Salted, memory-hard hash stored in place of the raw value.
    fn hash(&self, value: &str) -> SentinelResult<String>;

    /// Never panics and never errors: malformed hashes verify as `false`.
    fn verify(&self, value: &str, stored_hash: &str) -> bool;

    /// Fast, non-secret digest used only to correlate failed scans in logs.
    fn fingerprint(&self, value: &str) -> String;
}

/// NFC card UID handling.
pub trait CardHasher: Send + Sync {
    /// Stable digest used as the lookup key for a card.
    fn digest(&self, card_uid: &str) -> String;

    /// Loggable form of a card UID: its last four characters.
    fn redact(&self, card_uid: &str) -> String {
        let chars: Vec<char> = card_uid.chars().collect();
        let start = chars.len().saturating_sub(4);
        chars[start..].iter().collect()
    }
}

/// Issues the long-lived session credential after a completed login.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, uid: &str, role: &Role) -> SentinelResult<String>;
}

/// Role-based authorization.
///
/// Implementations are deterministic and deny by default.
pub trait PolicyEngine: Send + Sync {
    fn evaluate(&self, ctx: &PolicyContext) -> SentinelResult<PolicyVerdict>;
}

/// The shared collaborators every service is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserDirectory>,
    pub sessions: Arc<dyn SessionStore>,
    pub audit: Arc<dyn AuditSink>,
    pub attempts: Arc<AttemptTracker>,
    pub clock: Arc<dyn Clock>,
    pub passwords: Arc<dyn PasswordVerifier>,
    pub qr: Arc<dyn QrVerifier>,
    pub cards: Arc<dyn CardHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
}
