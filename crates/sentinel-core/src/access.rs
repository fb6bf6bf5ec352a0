//! Physical and role-based access decisions.
//!
//! `AccessGate` handles NFC taps at readers, records access results reported
//! by other devices, and gates privileged actions behind the role policy.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use sentinel_contracts::{
    error::SentinelResult,
    event::{names, sources, EventContext, EventDraft},
    outcome::{AccessResult, NfcDenial, NfcOutcome},
    policy::{PolicyContext, PolicyVerdict},
    user::CardStatus,
};

use crate::{
    audit_policy::{AuditClass, AuditPolicy, AuditRecorder},
    traits::{Collaborators, PolicyEngine},
};

/// One NFC tap as reported by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfcScanRequest {
    /// Raw card UID.  Only hashed or truncated forms leave this module.
    pub nfc_uid: String,
    /// Whether the reader accepted the card password.
    pub password_valid: bool,
    pub device_id: Option<String>,
}

/// Where and how an access result was observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessDetails {
    pub source: Option<String>,
    pub device_id: Option<String>,
    pub camera_id: Option<String>,
    pub area: Option<String>,
    pub reason: Option<String>,
    /// Merged into the event context after the fields above.
    pub extra: EventContext,
}

pub struct AccessGate {
    deps: Collaborators,
    audit: AuditRecorder,
    policy: Arc<dyn PolicyEngine>,
}

impl AccessGate {
    pub fn new(deps: Collaborators, policy: Arc<dyn PolicyEngine>, audit_policy: AuditPolicy) -> Self {
        let audit = AuditRecorder::new(deps.audit.clone(), audit_policy);
        Self { deps, audit, policy }
    }

    /// Decide an NFC tap.
    ///
    /// Checks run in order: request shape, card password, card registration,
    /// account status, card status.  The first failing check denies.
    pub fn nfc_scan(&self, req: &NfcScanRequest) -> SentinelResult<NfcOutcome> {
        let nfc_uid = req.nfc_uid.trim();
        let source = req
            .device_id
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| sources::UNKNOWN_DEVICE.to_string());

        if nfc_uid.is_empty() {
            return Ok(NfcOutcome::Denied {
                reason: NfcDenial::InvalidRequest,
            });
        }
        let truncated = self.deps.cards.redact(nfc_uid);

        if !req.password_valid {
            return self.deny(
                EventDraft::new(names::NFC_SCAN_DENIED)
                    .source(&source)
                    .with("nfc_uid_truncated", truncated.as_str())
                    .with("reason", NfcDenial::InvalidPassword.as_str()),
                NfcDenial::InvalidPassword,
            );
        }

        let Some(user) = self.deps.users.find_by_nfc_hash(&self.deps.cards.digest(nfc_uid))? else {
            return self.deny(
                EventDraft::new(names::NFC_SCAN_DENIED)
                    .source(&source)
                    .with("nfc_uid_truncated", truncated.as_str())
                    .with("reason", NfcDenial::CardNotRegistered.as_str()),
                NfcDenial::CardNotRegistered,
            );
        };

        if !user.is_active() {
            return self.deny(
                EventDraft::new(names::NFC_SCAN_DENIED)
                    .actor(&user.uid)
                    .source(&source)
                    .with("reason", NfcDenial::UserInactive.as_str())
                    .with("user_status", user.status.as_str()),
                NfcDenial::UserInactive,
            );
        }

        if user.nfc_status != CardStatus::Active {
            return self.deny(
                EventDraft::new(names::NFC_SCAN_DENIED)
                    .actor(&user.uid)
                    .source(&source)
                    .with("reason", NfcDenial::CardRevoked.as_str())
                    .with("nfc_status", user.nfc_status.as_str()),
                NfcDenial::CardRevoked,
            );
        }

        self.deps.users.touch_last_access(&user.uid, self.deps.clock.now())?;

        let event = self.audit.record(
            AuditClass::Grant,
            EventDraft::new(names::NFC_SCAN_GRANTED)
                .actor(&user.uid)
                .source(&source)
                .with("device_id", req.device_id.clone().map_or(Value::Null, Value::from))
                .with("user_role", user.role.as_str()),
        )?;

        info!(uid = %user.uid, device = %source, "NFC access granted");
        Ok(NfcOutcome::Granted {
            access_level: user.role.access_level().to_string(),
            uid: user.uid,
            role: user.role,
            event_id: event.map_or(0, |e| e.id),
        })
    }

    fn deny(&self, draft: EventDraft, reason: NfcDenial) -> SentinelResult<NfcOutcome> {
        warn!(reason = reason.as_str(), "NFC access denied");
        self.audit.record(AuditClass::Notice, draft)?;
        Ok(NfcOutcome::Denied { reason })
    }

    /// Record an access result observed by a device or camera.
    ///
    /// Returns the id of the appended event, or `None` when the append
    /// failed under a fail-open policy.
    pub fn log_access(
        &self,
        actor_uid: Option<&str>,
        result: AccessResult,
        details: AccessDetails,
    ) -> SentinelResult<Option<u64>> {
        let event_name = match result {
            AccessResult::Granted => names::ACCESS_GRANTED,
            AccessResult::Denied => names::ACCESS_DENIED,
            AccessResult::Attempt => names::ACCESS_ATTEMPT,
        };
        let opt = |v: Option<String>| v.map_or(Value::Null, Value::from);

        let mut draft = EventDraft::new(event_name)
            .maybe_actor(actor_uid)
            .with("result", result.as_str())
            .with("device_id", opt(details.device_id))
            .with("camera_id", opt(details.camera_id))
            .with("area", opt(details.area))
            .with("reason", opt(details.reason));
        draft.source = details.source;
        draft.context.extend(details.extra);

        let event = self.audit.record(AuditClass::Notice, draft)?;
        Ok(event.map(|e| e.id))
    }

    /// Role-gated authorization for `uid` performing `action` on `resource`.
    ///
    /// Unknown and non-active users are denied without consulting the policy.
    /// Every denial is audited as `authorization_denied`.
    pub fn authorize(&self, uid: &str, action: &str, resource: &str) -> SentinelResult<PolicyVerdict> {
        let verdict = match self.deps.users.find_by_uid(uid)? {
            None => PolicyVerdict::Deny {
                reason: format!("unknown user '{}'", uid),
            },
            Some(user) if !user.is_active() => PolicyVerdict::Deny {
                reason: format!("account is {}", user.status.as_str()),
            },
            Some(user) => self.policy.evaluate(&PolicyContext {
                uid: user.uid,
                role: user.role.0,
                action: action.to_string(),
                resource: resource.to_string(),
            })?,
        };

        if let PolicyVerdict::Deny { reason } = &verdict {
            warn!(uid = %uid, action = %action, reason = %reason, "authorization denied");
            self.audit.record(
                AuditClass::Notice,
                EventDraft::new(names::AUTHORIZATION_DENIED)
                    .actor(uid)
                    .source(sources::ADMIN_API)
                    .with("action", action)
                    .with("resource", resource)
                    .with("reason", reason.as_str()),
            )?;
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use sentinel_contracts::{
        error::SentinelResult,
        event::{names, AuditEvent, EventDraft},
        outcome::{AccessResult, NfcDenial, NfcOutcome},
        policy::{PolicyContext, PolicyVerdict},
        user::{AccountStatus, CardStatus, Role, UserRecord},
    };

    use crate::{
        attempts::AttemptTracker,
        audit_policy::AuditPolicy,
        clock::ManualClock,
        memory::{InMemorySessionStore, InMemoryUserDirectory},
        traits::{
            AuditSink, CardHasher, Collaborators, PasswordVerifier, PolicyEngine, QrVerifier,
            TokenIssuer, UserDirectory,
        },
    };

    use super::{AccessDetails, AccessGate, NfcScanRequest};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    #[derive(Default)]
    struct MockAudit {
        drafts: Mutex<Vec<EventDraft>>,
    }

    impl MockAudit {
        fn last(&self) -> EventDraft {
            self.drafts.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl AuditSink for MockAudit {
        fn append(&self, draft: EventDraft) -> SentinelResult<AuditEvent> {
            let mut drafts = self.drafts.lock().unwrap();
            drafts.push(draft.clone());
            Ok(AuditEvent {
                id: drafts.len() as u64,
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

    struct Fixed;

    impl PasswordVerifier for Fixed {
        fn verify(&self, _password: &str, _stored_hash: &str) -> bool {
            false
        }
    }

    impl QrVerifier for Fixed {
        fn generate_value(&self) -> String {
            String::new()
        }
        fn hash(&self, value: &str) -> SentinelResult<String> {
            Ok(value.to_string())
        }
        fn verify(&self, _value: &str, _stored_hash: &str) -> bool {
            false
        }
        fn fingerprint(&self, value: &str) -> String {
            value.to_string()
        }
    }

    impl CardHasher for Fixed {
        fn digest(&self, card_uid: &str) -> String {
            format!("digest:{}", card_uid)
        }
    }

    impl TokenIssuer for Fixed {
        fn issue(&self, uid: &str, _role: &Role) -> SentinelResult<String> {
            Ok(uid.to_string())
        }
    }

    /// Allows only `R-ADM`.
    struct AdminOnly;

    impl PolicyEngine for AdminOnly {
        fn evaluate(&self, ctx: &PolicyContext) -> SentinelResult<PolicyVerdict> {
            if ctx.role == Role::ADMIN {
                Ok(PolicyVerdict::Allow)
            } else {
                Ok(PolicyVerdict::Deny {
                    reason: "admins only".to_string(),
                })
            }
        }
    }

    fn card_holder(uid: &str, role: &str, card: &str) -> UserRecord {
        let mut u = UserRecord::new(uid, uid, format!("{uid}@example.com"), Role::new(role), "h");
        u.nfc_uid_hash = Some(format!("digest:{}", card));
        u.nfc_status = CardStatus::Active;
        u
    }

    fn gate() -> (AccessGate, Arc<MockAudit>, Arc<InMemoryUserDirectory>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 10, 26, 9, 0, 0).unwrap(),
        ));
        let audit = Arc::new(MockAudit::default());
        let users = Arc::new(InMemoryUserDirectory::with_users([
            card_holder("ADM-1", Role::ADMIN, "04A3B2C1D4E5F6"),
            card_holder("EMP-1", Role::EMPLOYEE, "04FFEE0011"),
        ]));
        let deps = Collaborators {
            users: users.clone(),
            sessions: Arc::new(InMemorySessionStore::new()),
            audit: audit.clone(),
            attempts: Arc::new(AttemptTracker::new(clock.clone(), 3, 600)),
            clock,
            passwords: Arc::new(Fixed),
            qr: Arc::new(Fixed),
            cards: Arc::new(Fixed),
            tokens: Arc::new(Fixed),
        };
        let gate = AccessGate::new(deps, Arc::new(AdminOnly), AuditPolicy::default());
        (gate, audit, users)
    }

    fn tap(uid: &str, password_valid: bool) -> NfcScanRequest {
        NfcScanRequest {
            nfc_uid: uid.to_string(),
            password_valid,
            device_id: Some("reader-7".to_string()),
        }
    }

    // ── NFC ──────────────────────────────────────────────────────────────────

    #[test]
    fn registered_card_is_granted() {
        let (gate, audit, users) = gate();
        let outcome = gate.nfc_scan(&tap("04A3B2C1D4E5F6", true)).unwrap();

        match outcome {
            NfcOutcome::Granted { uid, access_level, event_id, .. } => {
                assert_eq!(uid, "ADM-1");
                assert_eq!(access_level, "admin");
                assert_eq!(event_id, 1);
            }
            other => panic!("expected Granted, got {:?}", other),
        }
        let event = audit.last();
        assert_eq!(event.event_name, names::NFC_SCAN_GRANTED);
        assert_eq!(event.source.as_deref(), Some("reader-7"));
        assert!(users.find_by_uid("ADM-1").unwrap().unwrap().last_access.is_some());
    }

    #[test]
    fn empty_uid_is_an_invalid_request_and_not_audited() {
        let (gate, audit, _) = gate();
        let outcome = gate.nfc_scan(&tap("  ", true)).unwrap();

        assert_eq!(outcome, NfcOutcome::Denied { reason: NfcDenial::InvalidRequest });
        assert_eq!(outcome.status_code(), 400);
        assert!(audit.drafts.lock().unwrap().is_empty());
    }

    #[test]
    fn bad_card_password_is_denied_with_truncated_uid() {
        let (gate, audit, _) = gate();
        let outcome = gate.nfc_scan(&tap("04A3B2C1D4E5F6", false)).unwrap();

        assert_eq!(outcome, NfcOutcome::Denied { reason: NfcDenial::InvalidPassword });
        let event = audit.last();
        assert_eq!(event.context["nfc_uid_truncated"], "E5F6");
        assert_eq!(event.actor_uid, None);
    }

    #[test]
    fn unknown_card_is_not_registered() {
        let (gate, _, _) = gate();
        let mut req = tap("DEADBEEF", true);
        req.device_id = None;
        let outcome = gate.nfc_scan(&req).unwrap();
        assert_eq!(outcome, NfcOutcome::Denied { reason: NfcDenial::CardNotRegistered });
    }

    #[test]
    fn inactive_account_and_revoked_card_are_denied() {
        let (gate, _, users) = gate();

        let mut emp = users.find_by_uid("EMP-1").unwrap().unwrap();
        emp.nfc_status = CardStatus::Revoked;
        users.save(emp.clone()).unwrap();
        assert_eq!(
            gate.nfc_scan(&tap("04FFEE0011", true)).unwrap(),
            NfcOutcome::Denied { reason: NfcDenial::CardRevoked }
        );

        emp.status = AccountStatus::Inactive;
        users.save(emp).unwrap();
        assert_eq!(
            gate.nfc_scan(&tap("04FFEE0011", true)).unwrap(),
            NfcOutcome::Denied { reason: NfcDenial::UserInactive }
        );
    }

    // ── Access log ───────────────────────────────────────────────────────────

    #[test]
    fn access_results_map_to_event_names() {
        let (gate, audit, _) = gate();
        let mut extra = sentinel_contracts::event::EventContext::new();
        extra.insert("confidence".to_string(), json!(0.93));

        let id = gate
            .log_access(
                Some("EMP-1"),
                AccessResult::Denied,
                AccessDetails {
                    source: Some("camera:3".to_string()),
                    camera_id: Some("3".to_string()),
                    area: Some("lab".to_string()),
                    extra,
                    ..AccessDetails::default()
                },
            )
            .unwrap();

        assert_eq!(id, Some(1));
        let event = audit.last();
        assert_eq!(event.event_name, names::ACCESS_DENIED);
        assert_eq!(event.context["result"], "denied");
        assert_eq!(event.context["area"], "lab");
        assert_eq!(event.context["device_id"], serde_json::Value::Null);
        assert_eq!(event.context["confidence"], 0.93);
    }

    // ── Authorization ────────────────────────────────────────────────────────

    #[test]
    fn policy_allows_admins_and_audits_denials() {
        let (gate, audit, users) = gate();

        assert!(gate.authorize("ADM-1", "users:list", "*").unwrap().is_allowed());
        assert!(audit.drafts.lock().unwrap().is_empty());

        let verdict = gate.authorize("EMP-1", "users:list", "*").unwrap();
        assert!(!verdict.is_allowed());
        assert_eq!(audit.last().event_name, names::AUTHORIZATION_DENIED);

        let mut admin = users.find_by_uid("ADM-1").unwrap().unwrap();
        admin.status = AccountStatus::Revoked;
        users.save(admin).unwrap();
        assert_eq!(
            gate.authorize("ADM-1", "users:list", "*").unwrap(),
            PolicyVerdict::Deny { reason: "account is revoked".to_string() }
        );
        assert!(!gate.authorize("GHOST", "users:list", "*").unwrap().is_allowed());
    }
}
