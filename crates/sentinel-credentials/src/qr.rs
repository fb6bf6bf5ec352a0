//! QR credential values.
//!
//! A QR value is a random URL-safe string printed on the user's card.  Only
//! its Argon2id hash is stored.  The SHA-256 fingerprint is not a secret
//! check; it exists so failed scans can be correlated in the audit trail
//! without writing the scanned value.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use sentinel_contracts::error::SentinelResult;
use sentinel_core::traits::QrVerifier;

use crate::password::{hash_secret, verify_secret};

/// Default entropy of a generated value, in bytes.
pub const DEFAULT_VALUE_BYTES: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct QrCodec {
    value_bytes: usize,
}

impl QrCodec {
    pub fn new(value_bytes: usize) -> Self {
        Self {
            value_bytes: value_bytes.max(1),
        }
    }
}

impl Default for QrCodec {
    fn default() -> Self {
        Self::new(DEFAULT_VALUE_BYTES)
    }
}

impl QrVerifier for QrCodec {
    fn generate_value(&self) -> String {
        let mut bytes = vec![0u8; self.value_bytes];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn hash(&self, value: &str) -> SentinelResult<String> {
        hash_secret(value)
    }

    fn verify(&self, value: &str, stored_hash: &str) -> bool {
        verify_secret(value, stored_hash)
    }

    fn fingerprint(&self, value: &str) -> String {
        hex::encode(Sha256::digest(value.as_bytes()))
    }
}
