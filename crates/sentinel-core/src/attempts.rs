//! Failed-login attempt tracking with timed lockout.
//!
//! Records are keyed by user id, or by the normalized login handle when the
//! identity is unknown.  State lives in process memory only: locks do not
//! survive a restart and are not shared between instances.
//!
//! A record's lock is derived at read time from `locked_until`; nothing ever
//! sweeps expired records.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, info};

use crate::clock::Clock;

/// Per-key failure streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Consecutive failures since the last reset.
    pub count: u32,
    /// Unix seconds of the first failure in the streak.
    pub first_ts: i64,
    /// Unix seconds until which the key is locked; `0` when never locked.
    pub locked_until: i64,
}

/// What `register_failure` reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureTally {
    pub count: u32,
    /// Unix seconds; `0` when the key is not locked.
    pub locked_until: i64,
}

impl FailureTally {
    pub fn is_locked(&self) -> bool {
        self.locked_until > 0
    }
}

/// Thread-safe attempt counters.
///
/// Every read-modify-write happens under one map-wide mutex, so two
/// concurrent failures on the same key can never both observe the count
/// below the threshold.
pub struct AttemptTracker {
    records: Mutex<HashMap<String, AttemptRecord>>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    lock_window_secs: i64,
}

impl AttemptTracker {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_LOCK_WINDOW_SECS: i64 = 600;

    pub fn new(clock: Arc<dyn Clock>, max_attempts: u32, lock_window_secs: i64) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
            max_attempts,
            lock_window_secs,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn lock_window_secs(&self) -> i64 {
        self.lock_window_secs
    }

    /// Seconds left on the lock for `key`, or `0`.  Unknown keys return `0`.
    pub fn check_lock(&self, key: &str) -> i64 {
        let now = self.clock.unix_now();
        self.lock_records()
            .get(key)
            .map(|rec| rec.locked_until - now)
            .filter(|remaining| *remaining > 0)
            .unwrap_or(0)
    }

    /// Count one failure for `key`, locking it once the count reaches the
    /// configured maximum.
    pub fn register_failure(&self, key: &str) -> FailureTally {
        let now = self.clock.unix_now();
        let mut records = self.lock_records();
        let rec = records.entry(key.to_string()).or_insert(AttemptRecord {
            count: 0,
            first_ts: now,
            locked_until: 0,
        });

        rec.count += 1;
        if rec.count >= self.max_attempts {
            rec.locked_until = now + self.lock_window_secs;
            info!(
                key = %key,
                count = rec.count,
                locked_until = rec.locked_until,
                "attempt limit reached; key locked"
            );
        } else {
            debug!(key = %key, count = rec.count, "failed attempt registered");
        }

        FailureTally {
            count: rec.count,
            locked_until: rec.locked_until,
        }
    }

    /// Forget `key` entirely.  No-op for unknown keys.
    pub fn reset(&self, key: &str) {
        if self.lock_records().remove(key).is_some() {
            debug!(key = %key, "attempt record cleared");
        }
    }

    /// A copy of the current record for `key`.
    pub fn record(&self, key: &str) -> Option<AttemptRecord> {
        self.lock_records().get(key).copied()
    }

    fn lock_records(&self) -> MutexGuard<'_, HashMap<String, AttemptRecord>> {
        // The map stays consistent even if a holder panicked mid-update.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
