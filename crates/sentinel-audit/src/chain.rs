//! Canonical payloads, chain hashing, and chain verification.
//!
//! The signed payload of an event is the compact JSON object
//!
//! ```text
//! {"actor_uid":…,"context":{…},"event":…,"source":…}
//! ```
//!
//! with keys in sorted order at every level.  Each event's `hash_prev` is
//!
//! ```text
//! hex(SHA-256( previous.hash_prev (ASCII hex, omitted for the first event)
//!            || payload
//!            || raw 64-byte signature ))
//! ```
//!
//! so recomputing it walks the whole log and detects edits, reordering, and
//! deletion of any earlier event.

use ed25519_dalek::{Verifier as _, VerifyingKey};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    event::{AuditEvent, EventContext},
};

use crate::signer::decode_signature;

/// Serialize the signed fields of an event.
///
/// `serde_json` maps keep keys sorted, and `Value`'s `Display` writes
/// compact JSON, so the same fields always yield the same bytes.
pub fn canonical_payload(
    event_name: &str,
    actor_uid: Option<&str>,
    source: Option<&str>,
    context: &EventContext,
) -> Vec<u8> {
    let payload: Value = json!({
        "event": event_name,
        "actor_uid": actor_uid,
        "source": source,
        "context": context,
    });
    payload.to_string().into_bytes()
}

/// The canonical payload of a stored event.
pub fn event_payload(event: &AuditEvent) -> Vec<u8> {
    canonical_payload(
        &event.event_name,
        event.actor_uid.as_deref(),
        event.source.as_deref(),
        &event.context,
    )
}

/// Compute a chain hash.  Returns a lowercase 64-character hex string.
pub fn chain_hash(prev: Option<&str>, payload: &[u8], signature: &[u8]) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload);
    hasher.update(signature);
    hex::encode(hasher.finalize())
}

/// Walk `events` in order and recompute every `hash_prev`.
///
/// `anchor` is the `hash_prev` of the event preceding `events[0]`, or `None`
/// when `events` starts at the beginning of the log.
///
/// # Errors
///
/// `SentinelError::IntegrityFailure` naming the first event whose stored
/// hash diverges.  Events after it are not inspected.
pub fn audit_chain(anchor: Option<&str>, events: &[AuditEvent]) -> SentinelResult<()> {
    let mut prev: Option<&str> = anchor;
    let mut last_id: Option<u64> = None;

    for event in events {
        let fail = |reason: &str| SentinelError::IntegrityFailure {
            event_id: event.id,
            reason: reason.to_string(),
        };

        if last_id.is_some_and(|last| event.id <= last) {
            return Err(fail("event ids are not strictly increasing"));
        }
        let signature = decode_signature(&event.signature)
            .ok_or_else(|| fail("signature is not a valid base64 Ed25519 signature"))?;

        let expected = chain_hash(prev, &event_payload(event), &signature.to_bytes());
        if expected != event.hash_prev {
            return Err(fail("hash_prev does not match the recomputed chain hash"));
        }

        prev = Some(event.hash_prev.as_str());
        last_id = Some(event.id);
    }
    Ok(())
}

/// `true` when [`audit_chain`] accepts the full log.  An empty log is valid.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    audit_chain(None, events).is_ok()
}

/// Check every event's signature against `key`.
///
/// # Errors
///
/// `SentinelError::IntegrityFailure` at the first event whose signature does
/// not verify over its recomputed payload.
pub fn verify_signatures(key: &VerifyingKey, events: &[AuditEvent]) -> SentinelResult<()> {
    for event in events {
        let valid = decode_signature(&event.signature)
            .is_some_and(|sig| key.verify(&event_payload(event), &sig).is_ok());
        if !valid {
            return Err(SentinelError::IntegrityFailure {
                event_id: event.id,
                reason: "signature does not verify with the log's public key".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use sentinel_contracts::event::EventContext;

    use super::{canonical_payload, chain_hash};

    #[test]
    fn payload_keys_are_sorted_and_compact() {
        let ctx: EventContext = json!({ "zeta": 1, "alpha": "a" }).as_object().unwrap().clone();
        let bytes = canonical_payload("login_completed", Some("EMP-1"), None, &ctx);

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"actor_uid":"EMP-1","context":{"alpha":"a","zeta":1},"event":"login_completed","source":null}"#
        );
    }

    #[test]
    fn first_link_omits_the_previous_hash() {
        let first = chain_hash(None, b"payload", b"sig");
        let anchored = chain_hash(Some(""), b"payload", b"sig");
        assert_eq!(first, anchored, "an empty prefix must hash like no prefix");
        assert_ne!(first, chain_hash(Some(&first), b"payload", b"sig"));
        assert_eq!(first.len(), 64);
    }
}
