//! Runtime configuration for the Sentinel backend.
//!
//! `SentinelConfig` is read from a TOML document in which every section and
//! field is optional, then environment overrides are applied on top:
//!
//! ```toml
//! [auth]
//! qr_ttl_seconds = 60
//! max_attempts = 3
//! lock_window_seconds = 600
//!
//! [qr]
//! value_bytes = 20
//!
//! [audit]
//! max_listeners = 100
//! signing_key_path = "ed25519_secret.hex"
//! log_path = "audit.jsonl"
//! on_grant_failure = "fail-closed"
//! on_notice_failure = "fail-open"
//! on_admin_failure = "fail-closed"
//!
//! [token]
//! ttl_seconds = 3600
//!
//! [policy]
//! path = "policies/sentinel.toml"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use sentinel_contracts::error::{SentinelError, SentinelResult};

use crate::audit_policy::{AuditFailurePolicy, AuditPolicy};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub auth: AuthConfig,
    pub qr: QrConfig,
    pub audit: AuditConfig,
    pub token: TokenConfig,
    pub policy: PolicyConfig,
}

/// Login protocol and lockout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Seconds a pending session accepts a QR scan.
    pub qr_ttl_seconds: i64,
    /// Consecutive failures that engage the lock.
    pub max_attempts: u32,
    /// Seconds a key stays locked.
    pub lock_window_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            qr_ttl_seconds: 60,
            max_attempts: 3,
            lock_window_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Random bytes per generated QR value.
    pub value_bytes: usize,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self { value_bytes: 20 }
    }
}

/// Event log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Live-feed subscribers kept before the oldest is evicted.
    pub max_listeners: usize,
    /// Per-subscriber queue capacity.
    pub listener_buffer: usize,
    /// Hex Ed25519 seed.  Takes precedence over `signing_key_path`.
    pub signing_key_hex: Option<String>,
    /// Key file read at startup, created on first run.
    pub signing_key_path: PathBuf,
    /// JSON-lines audit file.  In-memory store when unset.
    pub log_path: Option<PathBuf>,
    pub on_grant_failure: AuditFailurePolicy,
    pub on_notice_failure: AuditFailurePolicy,
    pub on_admin_failure: AuditFailurePolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        let policy = AuditPolicy::default();
        Self {
            max_listeners: 100,
            listener_buffer: 1000,
            signing_key_hex: None,
            signing_key_path: PathBuf::from("ed25519_secret.hex"),
            log_path: None,
            on_grant_failure: policy.on_grant,
            on_notice_failure: policy.on_notice,
            on_admin_failure: policy.on_admin,
        }
    }
}

impl AuditConfig {
    pub fn failure_policy(&self) -> AuditPolicy {
        AuditPolicy {
            on_grant: self.on_grant_failure,
            on_notice: self.on_notice_failure,
            on_admin: self.on_admin_failure,
        }
    }
}

/// Session token settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HS256 secret.  A random per-process secret is used when unset.
    pub secret: Option<String>,
    pub ttl_seconds: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Role policy TOML.  The built-in policy is used when unset.
    pub path: Option<PathBuf>,
}

impl SentinelConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `SentinelError::ConfigError` if the TOML is malformed or a
    /// field has the wrong type.
    pub fn from_toml_str(s: &str) -> SentinelResult<Self> {
        toml::from_str(s).map_err(|e| SentinelError::ConfigError {
            reason: format!("failed to parse config TOML: {}", e),
        })
    }

    /// Read and parse the TOML file at `path`.
    pub fn from_file(path: &Path) -> SentinelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SentinelError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> SentinelResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> SentinelResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("QR_TTL_SECONDS") {
            self.auth.qr_ttl_seconds = parse_var("QR_TTL_SECONDS", &v)?;
        }
        if let Some(v) = lookup("MAX_ATTEMPTS") {
            self.auth.max_attempts = parse_var("MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("LOCK_WINDOW_SECONDS") {
            self.auth.lock_window_seconds = parse_var("LOCK_WINDOW_SECONDS", &v)?;
        }
        if let Some((name, v)) = lookup("QR_VALUE_BYTES")
            .map(|v| ("QR_VALUE_BYTES", v))
            .or_else(|| lookup("QR_BYTES").map(|v| ("QR_BYTES", v)))
        {
            self.qr.value_bytes = parse_var(name, &v)?;
        }
        if let Some(v) = lookup("MAX_SSE_LISTENERS") {
            self.audit.max_listeners = parse_var("MAX_SSE_LISTENERS", &v)?;
        }
        if let Some(v) = lookup("ED25519_SECRET_HEX").filter(|v| !v.trim().is_empty()) {
            self.audit.signing_key_hex = Some(v.trim().to_string());
        }
        if let Some(v) = lookup("ED25519_SECRET_PATH") {
            self.audit.signing_key_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("AUDIT_LOG_PATH") {
            self.audit.log_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SECRET_KEY").filter(|v| !v.is_empty()) {
            self.token.secret = Some(v);
        }
        if let Some(v) = lookup("JWT_EXP_SECONDS") {
            self.token.ttl_seconds = parse_var("JWT_EXP_SECONDS", &v)?;
        }
        debug!(auth = ?self.auth, qr_bytes = self.qr.value_bytes, "configuration overrides applied");
        Ok(())
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> SentinelResult<()> {
        let fail = |reason: &str| {
            Err(SentinelError::ConfigError {
                reason: reason.to_string(),
            })
        };
        if self.auth.qr_ttl_seconds <= 0 {
            return fail("auth.qr_ttl_seconds must be positive");
        }
        if self.auth.max_attempts == 0 {
            return fail("auth.max_attempts must be at least 1");
        }
        if self.auth.lock_window_seconds < 0 {
            return fail("auth.lock_window_seconds must not be negative");
        }
        if self.qr.value_bytes == 0 {
            return fail("qr.value_bytes must be at least 1");
        }
        if self.audit.max_listeners == 0 || self.audit.listener_buffer == 0 {
            return fail("audit.max_listeners and audit.listener_buffer must be at least 1");
        }
        if self.token.ttl_seconds <= 0 {
            return fail("token.ttl_seconds must be positive");
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> SentinelResult<T> {
    value.trim().parse().map_err(|_| SentinelError::ConfigError {
        reason: format!("{} has an invalid value '{}'", name, value),
    })
}
