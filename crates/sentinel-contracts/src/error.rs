//! Error types for the Sentinel access-control backend.
//!
//! Authentication outcomes (throttling, wrong password, unknown or expired
//! QR session, mismatched card) are not errors: they are `Ok` variants of
//! the outcome enums in [`crate::outcome`].  `SentinelError` is reserved for infrastructure
//! failures and for audit failures under a fail-closed policy.

use thiserror::Error;

/// The unified error type for the Sentinel crates.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// A password, QR value or NFC credential did not verify.
    #[error("invalid credential: {reason}")]
    InvalidCredential { reason: String },

    /// Hash-chain or signature verification failed at `event_id`.
    ///
    /// Verification stops at the first divergence; events after it are not
    /// inspected.
    #[error("audit chain integrity failure at event {event_id}: {reason}")]
    IntegrityFailure { event_id: u64, reason: String },

    /// The signing key could not be loaded, created or used.
    #[error("signing failed: {reason}")]
    SigningFailed { reason: String },

    /// The audit store could not read or persist an event.
    #[error("audit persistence failed: {reason}")]
    PersistenceFailed { reason: String },

    /// A fail-closed call site could not audit `event`.
    #[error("audit unavailable for '{event}': {reason}")]
    AuditUnavailable { event: String, reason: String },

    /// The referenced user does not exist.
    #[error("user '{uid}' not found")]
    UserNotFound { uid: String },

    /// The requested change conflicts with existing state.
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A session token could not be issued or validated.
    #[error("token error: {reason}")]
    TokenError { reason: String },
}

/// Convenience alias used throughout the Sentinel crates.
pub type SentinelResult<T> = Result<T, SentinelError>;
