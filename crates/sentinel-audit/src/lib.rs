//! # sentinel-audit
//!
//! Tamper-evident audit log for the Sentinel access-control backend.
//!
//! ## Overview
//!
//! Every event is Ed25519-signed over a canonical JSON payload and linked to
//! its predecessor through a SHA-256 chain hash.  Editing, reordering or
//! deleting any stored event breaks [`audit_chain`] at that event, and
//! editing a payload also breaks [`verify_signatures`].  Appended events are
//! offered to live subscribers through a bounded, non-blocking feed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_audit::{EventLog, InMemoryAuditStore, LiveFeed, Signer};
//!
//! let log = EventLog::new(
//!     Signer::load_or_create(None, Path::new("ed25519_secret.hex"))?,
//!     Arc::new(InMemoryAuditStore::new(clock)),
//!     Arc::new(LiveFeed::new(100, 1000)),
//! );
//! log.append(EventDraft::new(names::LOGOUT).actor("EMP-0001"))?;
//! assert_eq!(log.verify()?, 1);
//! ```

pub mod chain;
pub mod feed;
pub mod log;
pub mod sanitize;
pub mod signer;
pub mod store;

pub use chain::{audit_chain, canonical_payload, chain_hash, verify_chain, verify_signatures};
pub use feed::{LiveFeed, Subscription};
pub use log::EventLog;
pub use signer::Signer;
pub use store::{AuditStore, InMemoryAuditStore, JsonlAuditStore, PendingEvent};

// ── Tests ─────────────────────────────────────────────────────────────────────
