//! Credential and account administration.
//!
//! Mutations are written to the directory before they are audited.  Under a
//! fail-closed admin policy an audit failure is surfaced to the operator but
//! the mutation stays applied.

use tracing::info;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    event::{names, sources, EventDraft},
    user::{AccountStatus, CardStatus, UserRecord},
};

use crate::{
    audit_policy::{AuditClass, AuditPolicy, AuditRecorder},
    traits::Collaborators,
};

/// Where the QR secret of an assignment comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrSource {
    /// Generate a fresh random value.
    Generate,
    /// Use a value printed on an existing card.
    Provided(String),
    /// Keep the stored hash and only reactivate it.
    ReuseExisting,
}

/// Result of `assign_qr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrAssignment {
    pub uid: String,
    pub qr_card_id: String,
    /// The raw value, only when it was generated here.  It is not stored
    /// anywhere and cannot be recovered later.
    pub issued_value: Option<String>,
    pub reused_existing: bool,
}

pub struct CredentialAdmin {
    deps: Collaborators,
    audit: AuditRecorder,
}

impl CredentialAdmin {
    pub fn new(deps: Collaborators, policy: AuditPolicy) -> Self {
        let audit = AuditRecorder::new(deps.audit.clone(), policy);
        Self { deps, audit }
    }

    fn user(&self, uid: &str) -> SentinelResult<UserRecord> {
        self.deps
            .users
            .find_by_uid(uid)?
            .ok_or_else(|| SentinelError::UserNotFound { uid: uid.to_string() })
    }

    /// Issue or rotate the QR credential of `uid`.
    ///
    /// The card id defaults to the existing one, then to the uid.
    pub fn assign_qr(
        &self,
        uid: &str,
        source: QrSource,
        card_id: Option<&str>,
    ) -> SentinelResult<QrAssignment> {
        let mut user = self.user(uid)?;

        let (issued_value, reused_existing) = match source {
            QrSource::Generate => {
                let value = self.deps.qr.generate_value();
                user.qr_value_hash = Some(self.deps.qr.hash(&value)?);
                (Some(value), false)
            }
            QrSource::Provided(value) => {
                if value.is_empty() {
                    return Err(SentinelError::InvalidCredential {
                        reason: "QR value must not be empty".to_string(),
                    });
                }
                user.qr_value_hash = Some(self.deps.qr.hash(&value)?);
                (None, false)
            }
            QrSource::ReuseExisting => {
                if user.qr_value_hash.is_none() {
                    return Err(SentinelError::Conflict {
                        reason: format!("user '{}' has no QR credential to reuse", uid),
                    });
                }
                (None, true)
            }
        };

        let qr_card_id = card_id
            .map(str::to_string)
            .or_else(|| user.qr_card_id.clone())
            .unwrap_or_else(|| user.uid.clone());
        user.qr_card_id = Some(qr_card_id.clone());
        user.qr_status = CardStatus::Active;
        user.qr_revoked_at = None;
        self.deps.users.save(user)?;

        info!(uid = %uid, card = %qr_card_id, reused_existing, "QR credential assigned");
        self.audit.record(
            AuditClass::Admin,
            EventDraft::new(names::QR_ASSIGNED)
                .actor(uid)
                .source(sources::ADMIN_API)
                .with("qr_card_id", qr_card_id.as_str())
                .with("reused_existing", reused_existing),
        )?;

        Ok(QrAssignment {
            uid: uid.to_string(),
            qr_card_id,
            issued_value,
            reused_existing,
        })
    }

    /// Revoke the QR credential of `uid`.  The hash is kept.
    pub fn revoke_qr(&self, uid: &str) -> SentinelResult<()> {
        let mut user = self.user(uid)?;
        user.qr_status = CardStatus::Revoked;
        user.qr_revoked_at = Some(self.deps.clock.now());
        self.deps.users.save(user)?;

        info!(uid = %uid, "QR credential revoked");
        self.audit.record(
            AuditClass::Admin,
            EventDraft::new(names::QR_REVOKED)
                .actor(uid)
                .source(sources::ADMIN_API),
        )?;
        Ok(())
    }

    /// Bind the NFC card `nfc_uid` to `uid`.
    ///
    /// # Errors
    ///
    /// `Conflict` when the card is already bound to another user.
    pub fn assign_nfc(&self, uid: &str, nfc_uid: &str) -> SentinelResult<()> {
        let nfc_uid = nfc_uid.trim();
        if nfc_uid.is_empty() {
            return Err(SentinelError::InvalidCredential {
                reason: "NFC UID must not be empty".to_string(),
            });
        }
        let mut user = self.user(uid)?;
        let digest = self.deps.cards.digest(nfc_uid);
        let truncated = self.deps.cards.redact(nfc_uid);

        if let Some(holder) = self.deps.users.find_by_nfc_hash(&digest)? {
            if holder.uid != user.uid {
                return Err(SentinelError::Conflict {
                    reason: format!("NFC card already assigned to user '{}'", holder.uid),
                });
            }
        }

        let now = self.deps.clock.now();
        user.nfc_uid_hash = Some(digest);
        user.nfc_card_id = Some(format!("NFC-{}", truncated));
        user.nfc_status = CardStatus::Active;
        self.deps.users.save(user)?;

        info!(uid = %uid, card = %truncated, "NFC card assigned");
        self.audit.record(
            AuditClass::Admin,
            EventDraft::new(names::NFC_CARD_ASSIGNED)
                .actor(uid)
                .source(sources::ADMIN_API)
                .with("nfc_uid_truncated", truncated.as_str())
                .with("assigned_at", now.to_rfc3339()),
        )?;
        Ok(())
    }

    /// Revoke the account of `uid`.  It can no longer log in or open doors.
    pub fn revoke_user(&self, uid: &str) -> SentinelResult<()> {
        let mut user = self.user(uid)?;
        let previous = user.status;
        user.status = AccountStatus::Revoked;
        self.deps.users.save(user)?;

        info!(uid = %uid, previous = previous.as_str(), "account revoked");
        self.audit.record(
            AuditClass::Admin,
            EventDraft::new(names::USER_REVOKED)
                .actor(uid)
                .source(sources::ADMIN_API)
                .with("previous_status", previous.as_str()),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{TimeZone, Utc};

    use sentinel_contracts::{
        error::{SentinelError, SentinelResult},
        event::{names, AuditEvent, EventDraft},
        user::{AccountStatus, CardStatus, Role, UserRecord},
    };

    use crate::{
        attempts::AttemptTracker,
        audit_policy::AuditPolicy,
        clock::ManualClock,
        memory::{InMemorySessionStore, InMemoryUserDirectory},
        traits::{
            AuditSink, CardHasher, Collaborators, PasswordVerifier, QrVerifier, TokenIssuer,
            UserDirectory,
        },
    };

    use super::{CredentialAdmin, QrSource};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    #[derive(Default)]
    struct MockAudit {
        drafts: Mutex<Vec<EventDraft>>,
        fail: bool,
    }

    impl AuditSink for MockAudit {
        fn append(&self, draft: EventDraft) -> SentinelResult<AuditEvent> {
            if self.fail {
                return Err(SentinelError::SigningFailed {
                    reason: "key unavailable".to_string(),
                });
            }
            self.drafts.lock().unwrap().push(draft.clone());
            Ok(AuditEvent {
                id: 1,
                timestamp: Utc::now(),
                event_name: draft.event_name,
                actor_uid: draft.actor_uid,
                source: draft.source,
                context: draft.context,
                signature: String::new(),
                hash_prev: String::new(),
            })
        }
    }

    struct Plain;

    impl PasswordVerifier for Plain {
        fn verify(&self, _password: &str, _stored_hash: &str) -> bool {
            false
        }
    }

    impl QrVerifier for Plain {
        fn generate_value(&self) -> String {
            "FRESH-VALUE".to_string()
        }
        fn hash(&self, value: &str) -> SentinelResult<String> {
            Ok(format!("hashed:{}", value))
        }
        fn verify(&self, value: &str, stored_hash: &str) -> bool {
            stored_hash == format!("hashed:{}", value)
        }
        fn fingerprint(&self, value: &str) -> String {
            value.len().to_string()
        }
    }

    impl CardHasher for Plain {
        fn digest(&self, card_uid: &str) -> String {
            format!("digest:{}", card_uid)
        }
    }

    impl TokenIssuer for Plain {
        fn issue(&self, uid: &str, _role: &Role) -> SentinelResult<String> {
            Ok(uid.to_string())
        }
    }

    fn admin_with(audit: MockAudit) -> (CredentialAdmin, Arc<MockAudit>, Arc<InMemoryUserDirectory>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 10, 26, 9, 0, 0).unwrap(),
        ));
        let audit = Arc::new(audit);
        let users = Arc::new(InMemoryUserDirectory::with_users([
            UserRecord::new("EMP-1", "Ana", "ana@example.com", Role::default(), "h"),
            UserRecord::new("EMP-2", "Bob", "bob@example.com", Role::default(), "h"),
        ]));
        let deps = Collaborators {
            users: users.clone(),
            sessions: Arc::new(InMemorySessionStore::new()),
            audit: audit.clone(),
            attempts: Arc::new(AttemptTracker::new(clock.clone(), 3, 600)),
            clock,
            passwords: Arc::new(Plain),
            qr: Arc::new(Plain),
            cards: Arc::new(Plain),
            tokens: Arc::new(Plain),
        };
        (CredentialAdmin::new(deps, AuditPolicy::default()), audit, users)
    }

    fn admin() -> (CredentialAdmin, Arc<MockAudit>, Arc<InMemoryUserDirectory>) {
        admin_with(MockAudit::default())
    }

    #[test]
    fn generated_qr_is_returned_once_and_stored_hashed() {
        let (admin, audit, users) = admin();
        let assignment = admin.assign_qr("EMP-1", QrSource::Generate, None).unwrap();

        assert_eq!(assignment.issued_value.as_deref(), Some("FRESH-VALUE"));
        assert_eq!(assignment.qr_card_id, "EMP-1", "card id defaults to the uid");
        assert!(!assignment.reused_existing);

        let stored = users.find_by_uid("EMP-1").unwrap().unwrap();
        assert_eq!(stored.qr_value_hash.as_deref(), Some("hashed:FRESH-VALUE"));
        assert_eq!(stored.qr_status, CardStatus::Active);

        let drafts = audit.drafts.lock().unwrap();
        assert_eq!(drafts[0].event_name, names::QR_ASSIGNED);
        assert!(!serde_json::to_string(&drafts[0]).unwrap().contains("FRESH-VALUE"));
    }

    #[test]
    fn reuse_requires_an_existing_hash() {
        let (admin, _, _) = admin();
        let result = admin.assign_qr("EMP-1", QrSource::ReuseExisting, None);
        assert!(
            matches!(result, Err(SentinelError::Conflict { .. })),
            "expected Conflict, got {:?}",
            result
        );

        admin
            .assign_qr("EMP-1", QrSource::Provided("CARD-123".to_string()), Some("QR-CARD-9"))
            .unwrap();
        admin.revoke_qr("EMP-1").unwrap();
        let reused = admin.assign_qr("EMP-1", QrSource::ReuseExisting, None).unwrap();
        assert!(reused.reused_existing);
        assert_eq!(reused.qr_card_id, "QR-CARD-9", "existing card id is kept");
        assert_eq!(reused.issued_value, None);
    }

    #[test]
    fn revoke_keeps_hash_and_stamps_time() {
        let (admin, _, users) = admin();
        admin.assign_qr("EMP-1", QrSource::Generate, None).unwrap();
        admin.revoke_qr("EMP-1").unwrap();

        let stored = users.find_by_uid("EMP-1").unwrap().unwrap();
        assert_eq!(stored.qr_status, CardStatus::Revoked);
        assert!(stored.qr_revoked_at.is_some());
        assert!(stored.qr_value_hash.is_some());
        assert_eq!(stored.usable_qr_hash(), None);
    }

    #[test]
    fn unknown_user_is_reported() {
        let (admin, _, _) = admin();
        assert!(matches!(
            admin.revoke_qr("GHOST"),
            Err(SentinelError::UserNotFound { .. })
        ));
    }

    #[test]
    fn nfc_card_cannot_be_bound_twice() {
        let (admin, _, users) = admin();
        admin.assign_nfc("EMP-1", " 04A3B2C1D4E5F6 ").unwrap();

        let stored = users.find_by_uid("EMP-1").unwrap().unwrap();
        assert_eq!(stored.nfc_uid_hash.as_deref(), Some("digest:04A3B2C1D4E5F6"));
        assert_eq!(stored.nfc_status, CardStatus::Active);

        // Re-binding to the same holder is fine.
        admin.assign_nfc("EMP-1", "04A3B2C1D4E5F6").unwrap();

        let result = admin.assign_nfc("EMP-2", "04A3B2C1D4E5F6");
        assert!(
            matches!(result, Err(SentinelError::Conflict { .. })),
            "expected Conflict, got {:?}",
            result
        );
    }

    #[test]
    fn revoked_user_is_audited() {
        let (admin, audit, users) = admin();
        admin.revoke_user("EMP-2").unwrap();

        assert_eq!(
            users.find_by_uid("EMP-2").unwrap().unwrap().status,
            AccountStatus::Revoked
        );
        let drafts = audit.drafts.lock().unwrap();
        assert_eq!(drafts[0].event_name, names::USER_REVOKED);
        assert_eq!(drafts[0].context["previous_status"], "active");
    }

    #[test]
    fn audit_failure_surfaces_after_mutation() {
        let (admin, _, users) = admin_with(MockAudit {
            fail: true,
            ..MockAudit::default()
        });

        let result = admin.revoke_user("EMP-1");
        assert!(matches!(result, Err(SentinelError::AuditUnavailable { .. })));
        assert_eq!(
            users.find_by_uid("EMP-1").unwrap().unwrap().status,
            AccountStatus::Revoked,
            "the mutation stays applied"
        );
    }
}
