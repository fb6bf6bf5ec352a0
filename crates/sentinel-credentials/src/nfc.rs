//! NFC card UIDs are looked up by their SHA-256 digest.

use sha2::{Digest, Sha256};

use sentinel_core::traits::CardHasher;

#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256CardHasher;

impl CardHasher for Sha256CardHasher {
    fn digest(&self, card_uid: &str) -> String {
        hex::encode(Sha256::digest(card_uid.trim().as_bytes()))
    }
}
