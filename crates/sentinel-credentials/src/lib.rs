//! # sentinel-credentials
//!
//! Concrete secret handling behind the `sentinel-core` collaborator traits:
//!
//! - [`Argon2Passwords`] : `PasswordVerifier` over Argon2id PHC strings
//! - [`QrCodec`] : `QrVerifier`: random URL-safe values, Argon2id storage
//!   hashes, SHA-256 fingerprints for log correlation
//! - [`Sha256CardHasher`] : `CardHasher` keyed by the SHA-256 of the NFC UID
//! - [`JwtIssuer`] : `TokenIssuer` producing HS256 session tokens
//!
//! Verification never errors: malformed stored hashes simply do not match.

pub mod nfc;
pub mod password;
pub mod qr;
pub mod token;

pub use nfc::Sha256CardHasher;
pub use password::{hash_secret, verify_secret, Argon2Passwords};
pub use qr::QrCodec;
pub use token::{Claims, JwtIssuer};
