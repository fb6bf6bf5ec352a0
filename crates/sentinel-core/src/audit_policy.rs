//! Named handling of audit failures per call-site class.
//!
//! An audit append can fail (signing or persistence).  Whether the
//! triggering action continues is a per-class decision:
//!
//! - `Grant` : the action hands out access (pending session, completed
//!   login, NFC grant).
//! - `Notice` : rejections and informational events.
//! - `Admin` : credential and account mutations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    event::{AuditEvent, EventDraft},
};

use crate::traits::AuditSink;

/// What to do when the audit sink fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditFailurePolicy {
    /// Log the failure and let the action proceed unaudited.
    FailOpen,
    /// Abort the action with `SentinelError::AuditUnavailable`.
    FailClosed,
}

/// Call-site classes, each mapped to a failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditClass {
    Grant,
    Notice,
    Admin,
}

/// The failure policy for every call-site class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPolicy {
    pub on_grant: AuditFailurePolicy,
    pub on_notice: AuditFailurePolicy,
    pub on_admin: AuditFailurePolicy,
}

impl AuditPolicy {
    pub fn for_class(&self, class: AuditClass) -> AuditFailurePolicy {
        match class {
            AuditClass::Grant => self.on_grant,
            AuditClass::Notice => self.on_notice,
            AuditClass::Admin => self.on_admin,
        }
    }
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            on_grant: AuditFailurePolicy::FailClosed,
            on_notice: AuditFailurePolicy::FailOpen,
            on_admin: AuditFailurePolicy::FailClosed,
        }
    }
}

/// An audit sink paired with the policy that governs its failures.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    policy: AuditPolicy,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>, policy: AuditPolicy) -> Self {
        Self { sink, policy }
    }

    /// Append `draft`, applying the failure policy of `class`.
    ///
    /// Returns `Ok(None)` when the append failed under `FailOpen`.
    pub fn record(&self, class: AuditClass, draft: EventDraft) -> SentinelResult<Option<AuditEvent>> {
        let event_name = draft.event_name.clone();
        match self.sink.append(draft) {
            Ok(event) => Ok(Some(event)),
            Err(err) => match self.policy.for_class(class) {
                AuditFailurePolicy::FailOpen => {
                    error!(
                        event = %event_name,
                        error = %err,
                        "audit append failed; continuing unaudited"
                    );
                    Ok(None)
                }
                AuditFailurePolicy::FailClosed => {
                    error!(
                        event = %event_name,
                        error = %err,
                        "audit append failed; aborting action"
                    );
                    Err(SentinelError::AuditUnavailable {
                        event: event_name,
                        reason: err.to_string(),
                    })
                }
            },
        }
    }
}
