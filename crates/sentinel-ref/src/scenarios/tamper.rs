//! Scenario: retroactive edits to the audit log are detected.
//!
//! After a completed login, a copy of the log is altered three ways:
//! a failed attempt is rewritten as a success, an event is deleted, and an
//! event is re-attributed to another user.  Each copy fails verification at
//! the altered position, while the live log still verifies.

use sentinel_audit::{audit_chain, verify_signatures};
use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    event::{names, AuditEvent},
};
use sentinel_core::SentinelConfig;

use super::{happy_path, Fixture};

#[derive(Debug)]
pub struct TamperReport {
    pub events_checked: usize,
    /// Event id at which each altered copy stopped verifying, in the order
    /// rewritten / deleted / re-attributed.
    pub detections: Vec<Option<u64>>,
    /// Id at which the signature check caught the rewritten event.
    pub signature_detection: Option<u64>,
}

fn failing_id(result: SentinelResult<()>) -> SentinelResult<Option<u64>> {
    match result {
        Ok(()) => Ok(None),
        Err(SentinelError::IntegrityFailure { event_id, .. }) => Ok(Some(event_id)),
        Err(other) => Err(other),
    }
}

fn position(events: &[AuditEvent], name: &str) -> SentinelResult<usize> {
    events
        .iter()
        .position(|e| e.event_name == name)
        .ok_or_else(|| SentinelError::Conflict {
            reason: format!("no '{}' event to alter", name),
        })
}

pub fn run(fixture: &Fixture) -> SentinelResult<TamperReport> {
    let user = &fixture.users.employee;
    fixture.rt.protocol.login(&user.email, "wrong password")?;
    happy_path::run(fixture)?;

    let events = fixture.rt.log.events()?;
    let events_checked = fixture.rt.log.verify()?;

    let warn_at = position(&events, names::LOGIN_FAILED_WARN)?;
    let mut rewritten = events.clone();
    rewritten[warn_at].event_name = names::LOGIN_COMPLETED.to_string();

    let ok_at = position(&events, names::LOGIN_CREDENTIALS_OK)?;
    let mut deleted = events.clone();
    deleted.remove(ok_at);

    let done_at = position(&events, names::LOGIN_COMPLETED)?;
    let mut reattributed = events.clone();
    reattributed[done_at].actor_uid = Some(fixture.users.admin.uid.clone());

    let detections = vec![
        failing_id(audit_chain(None, &rewritten))?,
        failing_id(audit_chain(None, &deleted))?,
        failing_id(audit_chain(None, &reattributed))?,
    ];
    let signature_detection =
        failing_id(verify_signatures(&fixture.rt.log.verifying_key(), &rewritten))?;

    Ok(TamperReport {
        events_checked,
        detections,
        signature_detection,
    })
}

/// Run the tamper-detection scenario and print the result.
pub fn run_scenario() -> SentinelResult<()> {
    println!("=== Scenario: Audit tamper detection ===");
    println!();

    let fixture = Fixture::new(SentinelConfig::default())?;
    let report = run(&fixture)?;
    println!("  Live log:               VERIFIED ({} event(s))", report.events_checked);

    let labels = ["failure rewritten", "event deleted", "actor changed"];
    for (label, detection) in labels.iter().zip(&report.detections) {
        match detection {
            Some(id) => println!("  {:<22}  DETECTED at event {}", label, id),
            None => println!("  {:<22}  NOT DETECTED", label),
        }
    }
    if let Some(id) = report.signature_detection {
        println!("  Signature check:        rewritten event {} fails", id);
    }
    println!("  RESULT: TAMPERING DETECTED (expected)");
    println!();
    Ok(())
}
