//! Scenario D: the QR window closes before the scan.
//!
//! With a one-second window and the clock moved two seconds, the owner's
//! correct QR is refused and the session ends `expired`, never `completed`.
//! A client-reported timeout on a second session is recorded with
//! `client = true`.

use chrono::Duration;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    outcome::{LoginOutcome, ScanOutcome, TimeoutOutcome},
    session::SessionState,
};
use sentinel_core::SentinelConfig;

use super::{print_chain, print_events, Fixture};

#[derive(Debug)]
pub struct ExpiryReport {
    pub late_scan: ScanOutcome,
    pub late_state: Option<SessionState>,
    pub client_timeout: TimeoutOutcome,
    pub events: Vec<String>,
}

/// One-second QR window.
pub fn config() -> SentinelConfig {
    let mut config = SentinelConfig::default();
    config.auth.qr_ttl_seconds = 1;
    config
}

fn pending_session(fixture: &Fixture) -> SentinelResult<String> {
    let user = &fixture.users.employee;
    match fixture.rt.protocol.login(&user.email, &user.password)? {
        LoginOutcome::PendingQr { session_id, .. } => Ok(session_id),
        other => Err(SentinelError::Conflict {
            reason: format!("login: unexpected outcome {:?}", other),
        }),
    }
}

pub fn run(fixture: &Fixture) -> SentinelResult<ExpiryReport> {
    let protocol = &fixture.rt.protocol;

    let late = pending_session(fixture)?;
    fixture.clock.advance(Duration::seconds(2));
    let late_scan = protocol.scan_qr(&late, &fixture.users.employee.qr_value)?;
    let late_state = protocol.session(&late)?.map(|s| s.state);

    let abandoned = pending_session(fixture)?;
    let client_timeout = protocol.qr_timeout(&abandoned)?;

    Ok(ExpiryReport {
        late_scan,
        late_state,
        client_timeout,
        events: fixture.scenario_events()?,
    })
}

/// Run Scenario D and print the result.
pub fn run_scenario() -> SentinelResult<()> {
    println!("=== Scenario D: QR window expiry ===");
    println!();

    let fixture = Fixture::new(config())?;
    println!(
        "  QR window: {} second(s); clock advanced 2 seconds before scanning",
        fixture.rt.config.auth.qr_ttl_seconds
    );

    let report = run(&fixture)?;
    println!(
        "  Late scan:              [{}] {}",
        report.late_scan.status_code(),
        report.late_scan.reason().unwrap_or("accepted")
    );
    println!(
        "  Session state:          {}",
        report.late_state.map_or("missing", |s| s.as_str())
    );
    println!("  Client timeout:         {:?}", report.client_timeout);
    print_events(&report.events);
    print_chain(&fixture)?;
    println!("  RESULT: SESSION EXPIRED (expected)");
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use sentinel_contracts::{
        event::names,
        outcome::{ScanOutcome, TimeoutOutcome},
        session::SessionState,
    };

    use super::{config, run};
    use crate::scenarios::Fixture;

    #[test]
    fn late_scan_expires_instead_of_completing() {
        let fixture = Fixture::new(config()).unwrap();
        let report = run(&fixture).unwrap();

        assert_eq!(report.late_scan, ScanOutcome::SessionExpired);
        assert_eq!(report.late_state, Some(SessionState::Expired));
        assert_eq!(report.client_timeout, TimeoutOutcome::Expired);

        let expired = report
            .events
            .iter()
            .filter(|e| e.as_str() == names::QR_SESSION_EXPIRED)
            .count();
        assert_eq!(expired, 2, "late scan and client timeout are both recorded");
        assert!(!report.events.iter().any(|e| e == names::QR_SCANNED_OK));
    }

    #[test]
    fn client_timeout_is_flagged_in_the_log() {
        let fixture = Fixture::new(config()).unwrap();
        run(&fixture).unwrap();

        let last = fixture.rt.log.recent(1).unwrap().remove(0);
        assert_eq!(last.event_name, names::QR_SESSION_EXPIRED);
        assert_eq!(last.context["client"], true);
    }
}
