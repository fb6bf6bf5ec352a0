//! The two-phase login protocol.
//!
//! ```text
//!   login(handle, password) ──► Pending ──scan_qr(own QR)──────► Completed
//!                                  │    ──scan_qr(miss/foreign)─► Failed
//!                                  │    ──TTL elapsed / timeout─► Expired
//! ```
//!
//! Every rejection is a typed outcome and every path appends at least one
//! audit event.  The throttle key is the user id when the handle resolves,
//! otherwise the normalized handle, so probing unknown handles is throttled
//! exactly like probing a real account.

use chrono::Duration;
use tracing::{debug, info, warn};

use sentinel_contracts::{
    error::SentinelResult,
    event::{names, sources, EventDraft},
    outcome::{LoginOutcome, ScanOutcome, TimeoutOutcome},
    session::{LoginSession, SessionState},
    user::{normalize_handle, UserRecord},
};

use crate::{
    audit_policy::{AuditClass, AuditPolicy, AuditRecorder},
    config::AuthConfig,
    traits::Collaborators,
};

/// Render a lock duration the way users see it.
pub fn human_duration(secs: i64) -> String {
    let (mins, secs) = (secs / 60, secs % 60);
    match (mins, secs) {
        (0, s) => format!("{} segundos", s),
        (m, 0) => format!("{} minutos", m),
        (m, s) => format!("{} minutos y {} segundos", m, s),
    }
}

/// Last six characters of an identifier, for operational logs.
fn masked(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let start = chars.len().saturating_sub(6);
    format!("***{}", chars[start..].iter().collect::<String>())
}

/// Drives password and QR phases against the shared collaborators.
pub struct LoginProtocol {
    deps: Collaborators,
    audit: AuditRecorder,
    qr_ttl: Duration,
}

impl LoginProtocol {
    pub fn new(deps: Collaborators, auth: &AuthConfig, policy: AuditPolicy) -> Self {
        let audit = AuditRecorder::new(deps.audit.clone(), policy);
        Self {
            deps,
            audit,
            qr_ttl: Duration::seconds(auth.qr_ttl_seconds),
        }
    }

    /// Password phase.
    ///
    /// On success a pending session is opened and the caller must complete
    /// it with [`scan_qr`](Self::scan_qr) before `expires_at`.
    ///
    /// # Errors
    ///
    /// Storage failures, and audit failures on the grant path under a
    /// fail-closed policy (the pending session is then marked failed).
    pub fn login(&self, handle: &str, password: &str) -> SentinelResult<LoginOutcome> {
        let user = self.deps.users.find_by_handle(handle)?;
        let key = match &user {
            Some(u) => u.uid.clone(),
            None => normalize_handle(handle),
        };
        let actor = user.as_ref().map(|u| u.uid.as_str());

        let remaining = self.deps.attempts.check_lock(&key);
        if remaining > 0 {
            info!(key = %key, remaining_secs = remaining, "login refused: key locked");
            self.audit.record(
                AuditClass::Notice,
                EventDraft::new(names::LOGIN_FAILED_LOCK_ACTIVE)
                    .maybe_actor(actor)
                    .source(sources::AUTH_API)
                    .with("email", handle)
                    .with("remaining_sec", remaining),
            )?;
            return Ok(LoginOutcome::Throttled {
                remaining_secs: remaining,
                message: format!(
                    "Cuenta bloqueada por intentos fallidos. Intenta de nuevo en {}.",
                    human_duration(remaining)
                ),
            });
        }

        // Inactive and revoked accounts fail exactly like a wrong password.
        let verified = user.as_ref().filter(|u| {
            u.is_active() && self.deps.passwords.verify(password, &u.password_hash)
        });
        let Some(user) = verified else {
            return self.reject_password(&key, actor, handle);
        };

        let session = LoginSession::open(user.uid.clone(), self.deps.clock.now(), self.qr_ttl);
        let session_id = session.session_id.clone();
        let expires_at = session.expires_at;
        self.deps.sessions.insert(session)?;
        self.deps.attempts.reset(&key);

        let audited = self
            .audit
            .record(
                AuditClass::Grant,
                EventDraft::new(names::LOGIN_CREDENTIALS_OK)
                    .actor(&user.uid)
                    .source(sources::AUTH_API)
                    .with("email", handle),
            )
            .and_then(|_| {
                self.audit.record(
                    AuditClass::Grant,
                    EventDraft::new(names::LOGIN_SUCCESS_PENDING_QR)
                        .actor(&user.uid)
                        .source(sources::AUTH_API)
                        .with("session_id", session_id.as_str())
                        .with("expires_at", expires_at.to_rfc3339()),
                )
            });
        if let Err(err) = audited {
            self.withdraw(&session_id);
            return Err(err);
        }

        info!(
            uid = %user.uid,
            session = %masked(&session_id),
            "password accepted; awaiting QR"
        );
        Ok(LoginOutcome::PendingQr {
            session_id,
            expires_at,
            uid: user.uid.clone(),
            role: user.role.clone(),
        })
    }

    fn reject_password(
        &self,
        key: &str,
        actor: Option<&str>,
        handle: &str,
    ) -> SentinelResult<LoginOutcome> {
        let max = self.deps.attempts.max_attempts();
        let tally = self.deps.attempts.register_failure(key);
        let event_name = if tally.count >= max {
            names::LOGIN_FAILED_LOCK
        } else if tally.count == 1 {
            names::LOGIN_FAILED_WARN
        } else {
            names::LOGIN_FAILED_TIMEOUT
        };

        warn!(key = %key, attempt = tally.count, max, "login failed");
        self.audit.record(
            AuditClass::Notice,
            EventDraft::new(event_name)
                .maybe_actor(actor)
                .source(sources::AUTH_API)
                .with("email", handle)
                .with("attempt", tally.count)
                .with("max", max),
        )?;

        if tally.count >= max {
            let lock_secs = self.deps.attempts.lock_window_secs();
            return Ok(LoginOutcome::LockedOut {
                lock_secs,
                message: format!(
                    "Cuenta bloqueada por {} debido a múltiples intentos fallidos.",
                    human_duration(lock_secs)
                ),
            });
        }
        let attempts_remaining = max - tally.count;
        Ok(LoginOutcome::InvalidCredentials {
            attempts_remaining,
            message: format!("Credenciales inválidas. Intentos restantes: {}", attempts_remaining),
        })
    }

    /// QR phase.
    ///
    /// # Errors
    ///
    /// Storage and token failures, and audit failures on the completion path
    /// under a fail-closed policy.  In that case the session stays completed
    /// but no token is returned.
    pub fn scan_qr(&self, session_id: &str, qr_value: &str) -> SentinelResult<ScanOutcome> {
        let Some(session) = self.deps.sessions.get(session_id)? else {
            debug!(session = %masked(session_id), "scan for unknown session");
            self.audit.record(
                AuditClass::Notice,
                EventDraft::new(names::QR_SESSION_NOT_FOUND)
                    .source(sources::QR_API)
                    .with("session_id", session_id),
            )?;
            return Ok(ScanOutcome::SessionNotFound);
        };

        let now = self.deps.clock.now();
        match session.state {
            SessionState::Pending if session.is_expired_at(now) => {
                if !self.deps.sessions.transition(session_id, SessionState::Expired)? {
                    return self.reject_finalized(&session);
                }
                return self.reject_expired(&session);
            }
            SessionState::Expired => return self.reject_expired(&session),
            SessionState::Completed | SessionState::Failed => {
                return self.reject_closed(&session, session.state);
            }
            SessionState::Pending => {}
        }

        let remaining = self.deps.attempts.check_lock(&session.uid);
        if remaining > 0 {
            self.audit.record(
                AuditClass::Notice,
                EventDraft::new(names::LOGIN_FAILED_LOCK_ACTIVE)
                    .actor(&session.uid)
                    .source(sources::QR_API)
                    .with("session_id", session_id)
                    .with("remaining_sec", remaining),
            )?;
            return Ok(ScanOutcome::Throttled {
                remaining_secs: remaining,
                message: format!("Cuenta bloqueada. Intenta de nuevo en {}.", human_duration(remaining)),
            });
        }

        match self.match_qr(&session.uid, qr_value)? {
            None => {
                if !self.deps.sessions.transition(session_id, SessionState::Failed)? {
                    return self.reject_finalized(&session);
                }
                let tally = self.deps.attempts.register_failure(&session.uid);
                warn!(uid = %session.uid, attempt = tally.count, "QR not recognized");
                self.audit.record(
                    AuditClass::Notice,
                    EventDraft::new(names::QR_SCANNED_FAIL)
                        .actor(&session.uid)
                        .source(sources::QR_API)
                        .with("session_id", session_id)
                        .with("reason", "hash_miss")
                        .with("attempt", tally.count)
                        .with("fp", self.deps.qr.fingerprint(qr_value)),
                )?;
                Ok(ScanOutcome::HashMiss { attempt: tally.count })
            }

            Some(owner) if owner.uid != session.uid => {
                if !self.deps.sessions.transition(session_id, SessionState::Failed)? {
                    return self.reject_finalized(&session);
                }
                let tally = self.deps.attempts.register_failure(&session.uid);
                warn!(
                    expected_uid = %session.uid,
                    scanned_uid = %owner.uid,
                    "QR belongs to another user"
                );
                self.audit.record(
                    AuditClass::Notice,
                    EventDraft::new(names::QR_SCANNED_MISMATCH)
                        .actor(&session.uid)
                        .source(sources::QR_API)
                        .with("session_id", session_id)
                        .with("attempt", tally.count)
                        .with("expected_uid", session.uid.as_str())
                        .with("scanned_uid", owner.uid.as_str()),
                )?;
                Ok(ScanOutcome::SessionUserMismatch {
                    expected_uid: session.uid.clone(),
                    scanned_uid: owner.uid,
                    attempt: tally.count,
                })
            }

            Some(owner) => {
                if !self.deps.sessions.transition(session_id, SessionState::Completed)? {
                    return self.reject_finalized(&session);
                }

                self.deps.users.touch_last_access(&owner.uid, now)?;

                self.audit.record(
                    AuditClass::Grant,
                    EventDraft::new(names::QR_SCANNED_OK)
                        .actor(&owner.uid)
                        .source(sources::QR_API)
                        .with("session_id", session_id),
                )?;
                self.audit.record(
                    AuditClass::Grant,
                    EventDraft::new(names::LOGIN_COMPLETED)
                        .actor(&owner.uid)
                        .source(sources::AUTH_API)
                        .with("via", "qr")
                        .with("session_id", session_id),
                )?;

                let token = self.deps.tokens.issue(&owner.uid, &owner.role)?;
                info!(uid = %owner.uid, session = %masked(session_id), "login completed");
                Ok(ScanOutcome::Completed {
                    uid: owner.uid,
                    role: owner.role,
                    token,
                })
            }
        }
    }

    /// Find the user whose QR hash accepts `qr_value`.
    ///
    /// The user bound to the session is tried first.  Only when that fails
    /// are all other users with a usable QR hash tried, in directory order.
    pub fn match_qr(&self, bound_uid: &str, qr_value: &str) -> SentinelResult<Option<UserRecord>> {
        if let Some(user) = self.deps.users.find_by_uid(bound_uid)? {
            if self.qr_accepts(&user, qr_value) {
                return Ok(Some(user));
            }
        }

        debug!(uid = %bound_uid, "fast path missed; scanning all users");
        Ok(self
            .deps
            .users
            .list()?
            .into_iter()
            .filter(|u| u.uid != bound_uid)
            .find(|u| self.qr_accepts(u, qr_value)))
    }

    fn qr_accepts(&self, user: &UserRecord, qr_value: &str) -> bool {
        user.usable_qr_hash()
            .is_some_and(|hash| self.deps.qr.verify(qr_value, hash))
    }

    /// The client gave up waiting for a scan.
    ///
    /// Unknown sessions are ignored.  A pending session becomes expired.
    /// Completed sessions are left untouched and not audited; any other
    /// session records `qr_session_expired` with `client = true`.
    pub fn qr_timeout(&self, session_id: &str) -> SentinelResult<TimeoutOutcome> {
        let Some(session) = self.deps.sessions.get(session_id)? else {
            return Ok(TimeoutOutcome::UnknownSession);
        };
        if session.state == SessionState::Completed {
            return Ok(TimeoutOutcome::AlreadyFinal {
                state: SessionState::Completed,
            });
        }

        let expired_now = self.deps.sessions.transition(session_id, SessionState::Expired)?;
        let state = if expired_now {
            SessionState::Expired
        } else {
            self.deps
                .sessions
                .get(session_id)?
                .map(|s| s.state)
                .unwrap_or(session.state)
        };
        if state == SessionState::Completed {
            return Ok(TimeoutOutcome::AlreadyFinal { state });
        }

        self.audit.record(
            AuditClass::Notice,
            EventDraft::new(names::QR_SESSION_EXPIRED)
                .actor(&session.uid)
                .source(sources::QR_API)
                .with("session_id", session_id)
                .with("client", true),
        )?;

        Ok(match state {
            SessionState::Expired => TimeoutOutcome::Expired,
            other => TimeoutOutcome::AlreadyFinal { state: other },
        })
    }

    /// Record a logout.  Never fails: an audit failure is only logged.
    pub fn logout(&self, uid: Option<&str>) {
        let result = self.audit.record(
            AuditClass::Notice,
            EventDraft::new(names::LOGOUT)
                .maybe_actor(uid)
                .source(sources::AUTH_API),
        );
        if let Err(err) = result {
            warn!(error = %err, "logout not audited");
        }
    }

    /// Current state of a login session.
    pub fn session(&self, session_id: &str) -> SentinelResult<Option<LoginSession>> {
        self.deps.sessions.get(session_id)
    }

    fn reject_expired(&self, session: &LoginSession) -> SentinelResult<ScanOutcome> {
        info!(uid = %session.uid, session = %masked(&session.session_id), "QR window elapsed");
        self.audit.record(
            AuditClass::Notice,
            EventDraft::new(names::QR_SESSION_EXPIRED)
                .actor(&session.uid)
                .source(sources::QR_API)
                .with("session_id", session.session_id.as_str()),
        )?;
        Ok(ScanOutcome::SessionExpired)
    }

    fn reject_closed(&self, session: &LoginSession, state: SessionState) -> SentinelResult<ScanOutcome> {
        debug!(session = %masked(&session.session_id), state = %state, "scan on closed session");
        self.audit.record(
            AuditClass::Notice,
            EventDraft::new(names::QR_SESSION_CLOSED)
                .actor(&session.uid)
                .source(sources::QR_API)
                .with("session_id", session.session_id.as_str())
                .with("state", state.as_str()),
        )?;
        Ok(ScanOutcome::SessionClosed { state })
    }

    /// A concurrent scan or timeout finalized the session after it was read.
    /// Nothing is counted against the user; the state that won is reported.
    fn reject_finalized(&self, session: &LoginSession) -> SentinelResult<ScanOutcome> {
        let state = self
            .deps
            .sessions
            .get(&session.session_id)?
            .map(|s| s.state)
            .unwrap_or(SessionState::Failed);
        self.reject_closed(session, state)
    }

    /// Mark a pending session failed after its grant could not be audited.
    fn withdraw(&self, session_id: &str) {
        match self.deps.sessions.transition(session_id, SessionState::Failed) {
            Ok(_) => warn!(session = %masked(session_id), "pending session withdrawn"),
            Err(err) => warn!(error = %err, "could not withdraw pending session"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
