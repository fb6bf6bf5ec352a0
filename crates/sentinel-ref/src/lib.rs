//! # sentinel-ref
//!
//! Reference runtime for the Sentinel access-control backend.
//!
//! - [`Runtime`] wires every collaborator from a `SentinelConfig`.
//! - [`mock_data`] seeds three fictional accounts with real Argon2id hashes,
//!   issued QR values and NFC cards.
//! - [`scenarios`] drives the public operations end to end:
//!
//!   1. **A. Happy path** : password, then the owner's QR inside the window.
//!   2. **B. Lockout** : three wrong passwords, then a throttled fourth.
//!   3. **C. Mismatch** : another user's valid QR against a pending session.
//!   4. **D. Expiry** : a correct QR after the window closed.
//!   5. **NFC** : door taps, camera access logs, role authorization.
//!   6. **Tamper** : edited copies of the log fail verification.
//!
//! No external systems are contacted.

pub mod mock_data;
pub mod runtime;
pub mod scenarios;

pub use runtime::Runtime;
