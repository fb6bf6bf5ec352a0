//! The process signing key.
//!
//! One Ed25519 key signs every audit event.  It must survive restarts or the
//! log written by a previous process can no longer be verified, so
//! `load_or_create` resolves it in this order:
//!
//! 1. an explicitly configured hex seed,
//! 2. the hex seed stored in the key file,
//! 3. a freshly generated key, whose seed is then written to the key file.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use tracing::{info, warn};

use sentinel_contracts::error::{SentinelError, SentinelResult};

/// An Ed25519 signing key with its derived public key.
pub struct Signer {
    key: SigningKey,
}

impl Signer {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a 32-byte seed given as 64 hex characters.
    pub fn from_seed_hex(seed_hex: &str) -> SentinelResult<Self> {
        let bytes = hex::decode(seed_hex.trim()).map_err(|e| SentinelError::SigningFailed {
            reason: format!("signing key is not valid hex: {}", e),
        })?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| SentinelError::SigningFailed {
            reason: format!("signing key must be 32 bytes, got {}", bytes.len()),
        })?;
        Ok(Self::from_seed(&seed))
    }

    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Resolve the process key from configuration, then `key_path`, then a
    /// new key written to `key_path`.
    pub fn load_or_create(seed_hex: Option<&str>, key_path: &Path) -> SentinelResult<Self> {
        if let Some(seed_hex) = seed_hex.filter(|s| !s.trim().is_empty()) {
            info!("using configured audit signing key");
            return Self::from_seed_hex(seed_hex);
        }

        if key_path.exists() {
            let contents = fs::read_to_string(key_path).map_err(|e| SentinelError::SigningFailed {
                reason: format!("failed to read key file '{}': {}", key_path.display(), e),
            })?;
            info!(path = %key_path.display(), "loaded audit signing key");
            return Self::from_seed_hex(&contents);
        }

        let signer = Self::generate();
        if let Some(parent) = key_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SentinelError::SigningFailed {
                reason: format!("failed to create key directory '{}': {}", parent.display(), e),
            })?;
        }
        write_key_file(key_path, &signer.seed_hex()).map_err(|e| SentinelError::SigningFailed {
            reason: format!("failed to write key file '{}': {}", key_path.display(), e),
        })?;
        warn!(path = %key_path.display(), "generated new audit signing key");
        Ok(signer)
    }

    /// The seed as lowercase hex, in the format `from_seed_hex` accepts.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    pub fn sign(&self, payload: &[u8]) -> Signature {
        self.key.sign(payload)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &hex::encode(self.verifying_key().as_bytes()))
            .finish()
    }
}

/// Encode a signature the way it is stored on an event.
pub fn encode_signature(signature: &Signature) -> String {
    STANDARD.encode(signature.to_bytes())
}

/// Decode a stored base64 signature.  `None` when it is not a well-formed
/// Ed25519 signature.
pub fn decode_signature(encoded: &str) -> Option<Signature> {
    let bytes = STANDARD.decode(encoded).ok()?;
    Signature::from_slice(&bytes).ok()
}

/// Check a stored base64 signature over `payload`.
pub fn verify_signature(key: &VerifyingKey, payload: &[u8], encoded: &str) -> bool {
    decode_signature(encoded).is_some_and(|sig| key.verify(payload, &sig).is_ok())
}

/// Create the seed file readable by the owner only.
fn write_key_file(path: &Path, seed_hex: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(seed_hex.as_bytes())?;
    file.sync_all()
}
