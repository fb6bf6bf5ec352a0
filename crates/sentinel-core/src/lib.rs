//! # sentinel-core
//!
//! The authentication core of the Sentinel access-control backend.
//!
//! This crate provides:
//! - The collaborator traits (`AuditSink`, `UserDirectory`, `SessionStore`,
//!   `PasswordVerifier`, `QrVerifier`, `CardHasher`, `TokenIssuer`,
//!   `PolicyEngine`) and the `Clock` abstraction
//! - The `AttemptTracker` lockout counters
//! - `LoginProtocol`: password step, then QR step within the session TTL
//! - `AccessGate`: NFC taps, access logging, role authorization
//! - `CredentialAdmin`: QR/NFC provisioning and account revocation
//! - `SentinelConfig` and the named audit failure policy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_core::{LoginProtocol, traits::Collaborators};
//!
//! let protocol = LoginProtocol::new(deps, &config.auth, config.audit.failure_policy());
//! let outcome = protocol.login("ana@example.com", "secret")?;
//! ```

pub mod access;
pub mod admin;
pub mod attempts;
pub mod audit_policy;
pub mod clock;
pub mod config;
pub mod memory;
pub mod protocol;
pub mod traits;

pub use access::{AccessDetails, AccessGate, NfcScanRequest};
pub use admin::{CredentialAdmin, QrAssignment, QrSource};
pub use attempts::AttemptTracker;
pub use config::SentinelConfig;
pub use protocol::LoginProtocol;
