//! Scenario A: password, then the user's own QR within the window.
//!
//! Expected: the session completes, a session token is issued, and the log
//! records `login_credentials_ok`, `login_success_pending_qr`,
//! `qr_scanned_ok`, `login_completed` in that order.  A live subscriber
//! sees the same four events.

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    outcome::{LoginOutcome, ScanOutcome},
    session::SessionState,
};
use sentinel_core::SentinelConfig;

use super::{print_chain, print_events, Fixture};

#[derive(Debug)]
pub struct HappyPathReport {
    pub session_id: String,
    pub final_state: Option<SessionState>,
    pub token_uid: String,
    pub events: Vec<String>,
    pub live_events: Vec<String>,
}

fn unexpected(step: &str, got: impl std::fmt::Debug) -> SentinelError {
    SentinelError::Conflict {
        reason: format!("{}: unexpected outcome {:?}", step, got),
    }
}

pub fn run(fixture: &Fixture) -> SentinelResult<HappyPathReport> {
    let user = &fixture.users.employee;
    let mut live = fixture.rt.log.subscribe();

    let session_id = match fixture.rt.protocol.login(&user.email, &user.password)? {
        LoginOutcome::PendingQr { session_id, .. } => session_id,
        other => return Err(unexpected("login", other)),
    };

    fixture.clock.advance(chrono::Duration::seconds(5));

    let token = match fixture.rt.protocol.scan_qr(&session_id, &user.qr_value)? {
        ScanOutcome::Completed { token, .. } => token,
        other => return Err(unexpected("scan", other)),
    };
    let claims = fixture.rt.tokens.validate(&token)?;

    Ok(HappyPathReport {
        final_state: fixture.rt.protocol.session(&session_id)?.map(|s| s.state),
        session_id,
        token_uid: claims.uid,
        events: fixture.scenario_events()?,
        live_events: live.drain().into_iter().map(|s| s.event).collect(),
    })
}

/// Run Scenario A and print the result.
pub fn run_scenario() -> SentinelResult<()> {
    println!("=== Scenario A: Password + QR login ===");
    println!();

    let fixture = Fixture::new(SentinelConfig::default())?;
    let user = &fixture.users.employee;
    println!("  User: {} ({})", user.uid, user.email);

    let report = run(&fixture)?;
    println!(
        "  Session state:          {}",
        report.final_state.map_or("missing", |s| s.as_str())
    );
    println!("  Session token subject:  {}", report.token_uid);
    print_events(&report.events);
    println!("  Live feed delivered:    {} event(s)", report.live_events.len());
    print_chain(&fixture)?;
    println!("  RESULT: LOGIN COMPLETED (expected)");
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use sentinel_contracts::{event::names, session::SessionState};
    use sentinel_core::SentinelConfig;

    use super::run;
    use crate::scenarios::Fixture;

    #[test]
    fn login_then_own_qr_completes_the_session() {
        let fixture = Fixture::new(SentinelConfig::default()).unwrap();
        let report = run(&fixture).unwrap();

        assert_eq!(report.final_state, Some(SessionState::Completed));
        assert_eq!(report.token_uid, fixture.users.employee.uid);

        let expected = vec![
            names::LOGIN_CREDENTIALS_OK,
            names::LOGIN_SUCCESS_PENDING_QR,
            names::QR_SCANNED_OK,
            names::LOGIN_COMPLETED,
        ];
        assert_eq!(report.events, expected);
        assert_eq!(report.live_events, expected, "live feed must mirror the log");
        assert!(fixture.rt.log.verify().is_ok());
    }

    #[test]
    fn completed_session_cannot_be_replayed() {
        let fixture = Fixture::new(SentinelConfig::default()).unwrap();
        let report = run(&fixture).unwrap();

        let replay = fixture
            .rt
            .protocol
            .scan_qr(&report.session_id, &fixture.users.employee.qr_value)
            .unwrap();
        assert_eq!(replay.reason(), Some("session_closed"));
        assert_eq!(
            fixture.rt.protocol.session(&report.session_id).unwrap().map(|s| s.state),
            Some(SessionState::Completed)
        );
    }
}
