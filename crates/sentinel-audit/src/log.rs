//! The event log: sanitize, sign, chain, persist, broadcast.
//!
//! Appends go through a single writer lane.  Reading the tail hash and
//! inserting the new event happen under one lock, so two concurrent appends
//! can never chain from the same predecessor and fork the log.

use std::sync::{Arc, Mutex};

use ed25519_dalek::VerifyingKey;
use tracing::{debug, error};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    event::{AuditEvent, EventDraft},
};
use sentinel_core::traits::AuditSink;

use crate::{
    chain::{audit_chain, canonical_payload, chain_hash, verify_signatures},
    feed::{LiveFeed, Subscription},
    sanitize::sanitize_context,
    signer::{encode_signature, Signer},
    store::{AuditStore, PendingEvent},
};

pub struct EventLog {
    signer: Signer,
    store: Arc<dyn AuditStore>,
    feed: Arc<LiveFeed>,
    lane: Mutex<()>,
}

impl EventLog {
    pub fn new(signer: Signer, store: Arc<dyn AuditStore>, feed: Arc<LiveFeed>) -> Self {
        Self {
            signer,
            store,
            feed,
            lane: Mutex::new(()),
        }
    }

    /// Append one event and offer its summary to live subscribers.
    ///
    /// # Errors
    ///
    /// `PersistenceFailed` when the store rejects the write.  Nothing is
    /// broadcast in that case.
    pub fn append(&self, draft: EventDraft) -> SentinelResult<AuditEvent> {
        let context = sanitize_context(draft.context);
        let payload = canonical_payload(
            &draft.event_name,
            draft.actor_uid.as_deref(),
            draft.source.as_deref(),
            &context,
        );
        let signature = self.signer.sign(&payload);

        let stored = {
            let _lane = self.lane.lock().map_err(|_| SentinelError::PersistenceFailed {
                reason: "audit writer lane poisoned".to_string(),
            })?;
            let prev = self.store.last_hash()?;
            let hash_prev = chain_hash(prev.as_deref(), &payload, &signature.to_bytes());
            self.store
                .insert(PendingEvent {
                    event_name: draft.event_name,
                    actor_uid: draft.actor_uid,
                    source: draft.source,
                    context,
                    signature: encode_signature(&signature),
                    hash_prev,
                })
                .inspect_err(|e| error!(error = %e, "audit append failed"))?
        };

        let delivered = self.feed.publish(&stored.summary());
        debug!(
            id = stored.id,
            event = %stored.event_name,
            listeners = delivered,
            "audit event appended"
        );
        Ok(stored)
    }

    /// Up to `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> SentinelResult<Vec<AuditEvent>> {
        self.store.recent(limit)
    }

    /// Every event in id order.
    pub fn events(&self) -> SentinelResult<Vec<AuditEvent>> {
        self.store.all()
    }

    /// Recompute the whole chain.  Returns the number of events checked.
    ///
    /// # Errors
    ///
    /// `IntegrityFailure` at the first diverging event.
    pub fn verify(&self) -> SentinelResult<usize> {
        let events = self.store.all()?;
        audit_chain(None, &events)?;
        Ok(events.len())
    }

    /// Check every signature with this process's public key.
    pub fn verify_signatures(&self) -> SentinelResult<usize> {
        let events = self.store.all()?;
        verify_signatures(&self.signer.verifying_key(), &events)?;
        Ok(events.len())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signer.verifying_key()
    }

    pub fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }

    pub fn feed(&self) -> &LiveFeed {
        &self.feed
    }
}

impl AuditSink for EventLog {
    fn append(&self, draft: EventDraft) -> SentinelResult<AuditEvent> {
        EventLog::append(self, draft)
    }
}
