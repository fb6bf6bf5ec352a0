//! Composition root.
//!
//! `Runtime` builds every collaborator from a [`SentinelConfig`] and hands
//! the same set to the login protocol, the access gate and the credential
//! admin, so all three write into one event log.

use std::sync::Arc;

use tracing::info;

use sentinel_audit::{AuditStore, EventLog, InMemoryAuditStore, JsonlAuditStore, LiveFeed, Signer};
use sentinel_contracts::error::SentinelResult;
use sentinel_core::{
    clock::Clock,
    memory::{InMemorySessionStore, InMemoryUserDirectory},
    traits::Collaborators,
    AccessGate, AttemptTracker, CredentialAdmin, LoginProtocol, SentinelConfig,
};
use sentinel_credentials::{Argon2Passwords, JwtIssuer, QrCodec, Sha256CardHasher};
use sentinel_policy::TomlRolePolicy;

pub struct Runtime {
    pub config: SentinelConfig,
    pub clock: Arc<dyn Clock>,
    pub log: Arc<EventLog>,
    pub users: Arc<InMemoryUserDirectory>,
    pub sessions: Arc<InMemorySessionStore>,
    pub attempts: Arc<AttemptTracker>,
    pub passwords: Argon2Passwords,
    pub tokens: Arc<JwtIssuer>,
    pub protocol: LoginProtocol,
    pub access: AccessGate,
    pub admin: CredentialAdmin,
}

impl Runtime {
    /// Build from configuration.  The signing key is loaded from (or
    /// created at) the configured location.
    ///
    /// # Errors
    ///
    /// `ConfigError` for invalid settings or an unreadable policy file,
    /// `SigningFailed` for key problems, `PersistenceFailed` when the audit
    /// file cannot be opened.
    pub fn from_config(config: SentinelConfig, clock: Arc<dyn Clock>) -> SentinelResult<Self> {
        let signer = Signer::load_or_create(
            config.audit.signing_key_hex.as_deref(),
            &config.audit.signing_key_path,
        )?;
        Self::with_signer(config, clock, signer)
    }

    /// Build with a throwaway signing key, for demos and tests.
    pub fn ephemeral(config: SentinelConfig, clock: Arc<dyn Clock>) -> SentinelResult<Self> {
        Self::with_signer(config, clock, Signer::generate())
    }

    pub fn with_signer(
        config: SentinelConfig,
        clock: Arc<dyn Clock>,
        signer: Signer,
    ) -> SentinelResult<Self> {
        config.validate()?;

        let store: Arc<dyn AuditStore> = match &config.audit.log_path {
            Some(path) => Arc::new(JsonlAuditStore::open(path.clone(), clock.clone())?),
            None => Arc::new(InMemoryAuditStore::new(clock.clone())),
        };
        let feed = Arc::new(LiveFeed::new(
            config.audit.max_listeners,
            config.audit.listener_buffer,
        ));
        let log = Arc::new(EventLog::new(signer, store, feed));

        let users = Arc::new(InMemoryUserDirectory::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let attempts = Arc::new(AttemptTracker::new(
            clock.clone(),
            config.auth.max_attempts,
            config.auth.lock_window_seconds,
        ));
        let tokens = Arc::new(JwtIssuer::from_config(&config.token));
        let policy = Arc::new(TomlRolePolicy::load(config.policy.path.as_deref())?);

        let deps = Collaborators {
            users: users.clone(),
            sessions: sessions.clone(),
            audit: log.clone(),
            attempts: attempts.clone(),
            clock: clock.clone(),
            passwords: Arc::new(Argon2Passwords),
            qr: Arc::new(QrCodec::new(config.qr.value_bytes)),
            cards: Arc::new(Sha256CardHasher),
            tokens: tokens.clone(),
        };
        let audit_policy = config.audit.failure_policy();

        info!(
            qr_ttl = config.auth.qr_ttl_seconds,
            max_attempts = config.auth.max_attempts,
            persistent_log = config.audit.log_path.is_some(),
            "runtime assembled"
        );

        Ok(Self {
            protocol: LoginProtocol::new(deps.clone(), &config.auth, audit_policy),
            access: AccessGate::new(deps.clone(), policy, audit_policy),
            admin: CredentialAdmin::new(deps, audit_policy),
            config,
            clock,
            log,
            users,
            sessions,
            attempts,
            passwords: Argon2Passwords,
            tokens,
        })
    }
}
