//! Argon2id password hashing and verification.
//!
//! Hashes are PHC strings with a random salt from [`OsRng`], so the
//! algorithm parameters travel with the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier as _, SaltString};
use argon2::Argon2;
use tracing::debug;

use sentinel_contracts::error::{SentinelError, SentinelResult};
use sentinel_core::traits::PasswordVerifier;

/// Hash `secret` with Argon2id and a fresh salt.
///
/// # Errors
///
/// `InvalidCredential` when the hasher rejects the input.
pub fn hash_secret(secret: &str) -> SentinelResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SentinelError::InvalidCredential {
            reason: format!("argon2 hashing failed: {}", e),
        })
}

/// `true` when `secret` matches the PHC string `stored_hash`.
///
/// Malformed hashes verify as `false`.
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "stored hash is not a PHC string");
            return false;
        }
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Argon2id [`PasswordVerifier`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Passwords;

impl Argon2Passwords {
    pub fn hash_password(&self, password: &str) -> SentinelResult<String> {
        hash_secret(password)
    }
}

impl PasswordVerifier for Argon2Passwords {
    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        verify_secret(password, stored_hash)
    }
}

#[cfg(test)]
mod tests {
    use sentinel_core::traits::PasswordVerifier;

    use super::{hash_secret, Argon2Passwords};

    #[test]
    fn test_hash_and_verify() {
        let passwords = Argon2Passwords;
        let hash = passwords.hash_password("correct-horse-battery-staple").unwrap();

        assert!(hash.starts_with("$argon2id$"), "expected argon2id PHC prefix, got {}", hash);
        assert!(passwords.verify("correct-horse-battery-staple", &hash));
        assert!(!passwords.verify("wrong-password", &hash), "wrong password must not verify");
    }

    #[test]
    fn test_same_secret_hashes_differently() {
        assert_ne!(hash_secret("s3cret").unwrap(), hash_secret("s3cret").unwrap(), "salts must differ");
    }

    #[test]
    fn test_malformed_hash_is_false() {
        assert!(!Argon2Passwords.verify("anything", "not-a-phc-string"));
        assert!(!Argon2Passwords.verify("anything", ""));
    }
}
