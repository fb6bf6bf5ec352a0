//! Scenario C: another user's valid QR scanned against a pending session.
//!
//! The scan is refused as a session/user mismatch, the session is failed,
//! and the failure counts against the session owner.  After a fresh login
//! (which clears the counter) a value that matches nobody is refused as a
//! hash miss, logged only by fingerprint.

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    outcome::{LoginOutcome, ScanOutcome},
    session::SessionState,
};
use sentinel_core::SentinelConfig;

use super::{print_chain, print_events, Fixture};

#[derive(Debug)]
pub struct MismatchReport {
    pub mismatch: ScanOutcome,
    pub mismatch_state: Option<SessionState>,
    pub failures_after_mismatch: u32,
    pub unknown_value: ScanOutcome,
    pub events: Vec<String>,
}

fn pending_session(fixture: &Fixture) -> SentinelResult<String> {
    let owner = &fixture.users.employee;
    match fixture.rt.protocol.login(&owner.email, &owner.password)? {
        LoginOutcome::PendingQr { session_id, .. } => Ok(session_id),
        other => Err(SentinelError::Conflict {
            reason: format!("login: unexpected outcome {:?}", other),
        }),
    }
}

pub fn run(fixture: &Fixture) -> SentinelResult<MismatchReport> {
    let protocol = &fixture.rt.protocol;
    let owner_failures = || {
        fixture
            .rt
            .attempts
            .record(&fixture.users.employee.uid)
            .map_or(0, |r| r.count)
    };

    let first = pending_session(fixture)?;
    let mismatch = protocol.scan_qr(&first, &fixture.users.guard.qr_value)?;
    let mismatch_state = protocol.session(&first)?.map(|s| s.state);
    let failures_after_mismatch = owner_failures();

    let second = pending_session(fixture)?;
    let unknown_value = protocol.scan_qr(&second, "printed-on-no-card")?;

    Ok(MismatchReport {
        mismatch,
        mismatch_state,
        failures_after_mismatch,
        unknown_value,
        events: fixture.scenario_events()?,
    })
}

/// Run Scenario C and print the result.
pub fn run_scenario() -> SentinelResult<()> {
    println!("=== Scenario C: QR belongs to another user ===");
    println!();

    let fixture = Fixture::new(SentinelConfig::default())?;
    println!(
        "  Session owner: {}   Scanned card: {}",
        fixture.users.employee.uid, fixture.users.guard.uid
    );

    let report = run(&fixture)?;
    println!(
        "  Mismatch scan:          [{}] {}",
        report.mismatch.status_code(),
        report.mismatch.reason().unwrap_or("accepted")
    );
    println!(
        "  Session state:          {}",
        report.mismatch_state.map_or("missing", |s| s.as_str())
    );
    println!(
        "  Unknown value scan:     [{}] {}",
        report.unknown_value.status_code(),
        report.unknown_value.reason().unwrap_or("accepted")
    );
    println!("  Owner failure counter:  {} after mismatch", report.failures_after_mismatch);
    print_events(&report.events);
    print_chain(&fixture)?;
    println!("  RESULT: SCANS REJECTED (expected)");
    println!();
    Ok(())
}
