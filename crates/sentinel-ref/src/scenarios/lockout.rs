//! Scenario B: three wrong passwords lock the account.
//!
//! The first two rejections report the attempts left, the third engages the
//! ten-minute lock, and a fourth attempt is refused by the lock check alone:
//! the counter does not move and only `login_failed_lock_active` is
//! recorded.  Once the window passes, the correct password works again.

use chrono::Duration;

use sentinel_contracts::{error::SentinelResult, outcome::LoginOutcome};
use sentinel_core::SentinelConfig;

use super::{print_chain, print_events, Fixture};

#[derive(Debug)]
pub struct LockoutReport {
    pub rejections: Vec<LoginOutcome>,
    pub count_after_lock: u32,
    pub count_after_throttled_attempt: u32,
    pub after_window: LoginOutcome,
    pub events: Vec<String>,
}

pub fn run(fixture: &Fixture) -> SentinelResult<LockoutReport> {
    let user = &fixture.users.employee;
    let protocol = &fixture.rt.protocol;
    let count = || fixture.rt.attempts.record(&user.uid).map_or(0, |r| r.count);

    let mut rejections = Vec::new();
    for _ in 0..3 {
        rejections.push(protocol.login(&user.email, "not-the-password")?);
    }
    let count_after_lock = count();

    rejections.push(protocol.login(&user.email, &user.password)?);
    let count_after_throttled_attempt = count();
    let events = fixture.scenario_events()?;

    fixture
        .clock
        .advance(Duration::seconds(fixture.rt.config.auth.lock_window_seconds + 1));
    let after_window = protocol.login(&user.email, &user.password)?;

    Ok(LockoutReport {
        rejections,
        count_after_lock,
        count_after_throttled_attempt,
        after_window,
        events,
    })
}

/// Run Scenario B and print the result.
pub fn run_scenario() -> SentinelResult<()> {
    println!("=== Scenario B: Lockout after repeated failures ===");
    println!();

    let fixture = Fixture::new(SentinelConfig::default())?;
    println!("  User: {}", fixture.users.employee.email);

    let report = run(&fixture)?;
    for (n, outcome) in report.rejections.iter().enumerate() {
        println!(
            "  Attempt {}: [{}] {}",
            n + 1,
            outcome.status_code(),
            outcome.message().unwrap_or("accepted")
        );
    }
    println!(
        "  Failure counter:        {} after lock, {} after throttled attempt",
        report.count_after_lock, report.count_after_throttled_attempt
    );
    print_events(&report.events);
    println!(
        "  After lock window:      [{}] {}",
        report.after_window.status_code(),
        report.after_window.message().unwrap_or("password accepted")
    );
    print_chain(&fixture)?;
    println!("  RESULT: LOCKED, THEN RECOVERED (expected)");
    println!();
    Ok(())
}
