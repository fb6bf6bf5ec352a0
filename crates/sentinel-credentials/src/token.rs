//! HS256 session tokens issued when a login completes.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    user::Role,
};
use sentinel_core::{config::TokenConfig, traits::TokenIssuer};

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub uid: String,
    pub role: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
    /// Unique token id for revocation and audit correlation.
    pub jti: String,
}

pub struct JwtIssuer {
    secret: Vec<u8>,
    ttl_seconds: i64,
}

impl JwtIssuer {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds,
        }
    }

    /// Build from configuration.  Without a configured secret a random one
    /// is generated, so tokens do not survive a restart.
    pub fn from_config(config: &TokenConfig) -> Self {
        match config.secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret.as_bytes(), config.ttl_seconds),
            None => {
                warn!("no token secret configured; using a random per-process secret");
                let mut bytes = [0u8; 32];
                OsRng.fill_bytes(&mut bytes);
                Self::new(URL_SAFE_NO_PAD.encode(bytes), config.ttl_seconds)
            }
        }
    }

    /// Decode `token` and check its signature and expiry.
    ///
    /// # Errors
    ///
    /// `TokenError` for a bad signature, malformed token or expired claims.
    pub fn validate(&self, token: &str) -> SentinelResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| SentinelError::TokenError {
            reason: e.to_string(),
        })
    }

    fn sign(&self, claims: &Claims) -> SentinelResult<String> {
        encode(&Header::default(), claims, &EncodingKey::from_secret(&self.secret)).map_err(|e| {
            SentinelError::TokenError {
                reason: e.to_string(),
            }
        })
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, uid: &str, role: &Role) -> SentinelResult<String> {
        let now = chrono::Utc::now().timestamp();
        self.sign(&Claims {
            uid: uid.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use sentinel_contracts::{error::SentinelError, user::Role};
    use sentinel_core::{config::TokenConfig, traits::TokenIssuer};

    use super::{Claims, JwtIssuer};

    fn issuer() -> JwtIssuer {
        JwtIssuer::new("test-secret-that-is-long-enough-for-hmac", 3600)
    }

    #[test]
    fn test_issue_and_validate() {
        let issuer = issuer();
        let token = issuer.issue("EMP-0001", &Role::new(Role::ADMIN)).unwrap();

        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.uid, "EMP-0001");
        assert_eq!(claims.role, "R-ADM");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_expired_token_fails() {
        let issuer = issuer();
        // Well past the default 60 second leeway.
        let now = chrono::Utc::now().timestamp();
        let token = issuer
            .sign(&Claims {
                uid: "EMP-0001".to_string(),
                role: "R-EMP".to_string(),
                iat: now - 600,
                exp: now - 300,
                jti: "j".to_string(),
            })
            .unwrap();

        match issuer.validate(&token) {
            Err(SentinelError::TokenError { .. }) => {}
            other => panic!("expected TokenError, got {:?}", other),
        }
    }

    #[test]
    fn test_different_secrets_fail() {
        let token = JwtIssuer::new("secret-alpha", 60)
            .issue("EMP-0002", &Role::default())
            .unwrap();
        assert!(JwtIssuer::new("secret-bravo", 60).validate(&token).is_err());
    }

    #[test]
    fn test_unconfigured_secret_is_random() {
        let config = TokenConfig::default();
        let a = JwtIssuer::from_config(&config);
        let b = JwtIssuer::from_config(&config);

        let token = a.issue("EMP-0001", &Role::default()).unwrap();
        assert!(a.validate(&token).is_ok());
        assert!(b.validate(&token).is_err(), "each process secret must differ");
    }
}
