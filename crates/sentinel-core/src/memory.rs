//! In-memory reference implementations of `UserDirectory` and `SessionStore`.
//!
//! Both are safe to share across threads.  A poisoned lock is reported as
//! `SentinelError::PersistenceFailed` rather than panicking.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, RwLock},
};

use chrono::{DateTime, Utc};
use tracing::debug;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    session::{LoginSession, SessionState},
    user::{normalize_handle, UserRecord},
};

use crate::traits::{SessionStore, UserDirectory};

fn poisoned<E>(what: &str) -> impl FnOnce(E) -> SentinelError + '_ {
    move |_| SentinelError::PersistenceFailed {
        reason: format!("{} lock poisoned", what),
    }
}

// ── Users ─────────────────────────────────────────────────────────────────────

/// Users keyed by uid, listed in uid order.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<BTreeMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory pre-populated with `users`.
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let map = users.into_iter().map(|u| (u.uid.clone(), u)).collect();
        Self {
            users: RwLock::new(map),
        }
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_by_uid(&self, uid: &str) -> SentinelResult<Option<UserRecord>> {
        let users = self.users.read().map_err(poisoned("user directory"))?;
        Ok(users.get(uid).cloned())
    }

    fn find_by_handle(&self, handle: &str) -> SentinelResult<Option<UserRecord>> {
        let wanted = normalize_handle(handle);
        let users = self.users.read().map_err(poisoned("user directory"))?;
        Ok(users
            .values()
            .find(|u| normalize_handle(&u.email) == wanted)
            .cloned())
    }

    fn find_by_nfc_hash(&self, nfc_uid_hash: &str) -> SentinelResult<Option<UserRecord>> {
        let users = self.users.read().map_err(poisoned("user directory"))?;
        Ok(users
            .values()
            .find(|u| u.nfc_uid_hash.as_deref() == Some(nfc_uid_hash))
            .cloned())
    }

    fn list(&self) -> SentinelResult<Vec<UserRecord>> {
        let users = self.users.read().map_err(poisoned("user directory"))?;
        Ok(users.values().cloned().collect())
    }

    fn save(&self, user: UserRecord) -> SentinelResult<()> {
        let mut users = self.users.write().map_err(poisoned("user directory"))?;
        users.insert(user.uid.clone(), user);
        Ok(())
    }

    fn touch_last_access(&self, uid: &str, at: DateTime<Utc>) -> SentinelResult<bool> {
        let mut users = self.users.write().map_err(poisoned("user directory"))?;
        Ok(users.get_mut(uid).map(|u| u.last_access = Some(at)).is_some())
    }
}

// ── Sessions ──────────────────────────────────────────────────────────────────

/// Login sessions keyed by session id.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, LoginSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: LoginSession) -> SentinelResult<()> {
        let mut sessions = self.sessions.lock().map_err(poisoned("session store"))?;
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    fn get(&self, session_id: &str) -> SentinelResult<Option<LoginSession>> {
        let sessions = self.sessions.lock().map_err(poisoned("session store"))?;
        Ok(sessions.get(session_id).cloned())
    }

    fn transition(&self, session_id: &str, next: SessionState) -> SentinelResult<bool> {
        let mut sessions = self.sessions.lock().map_err(poisoned("session store"))?;
        match sessions.get_mut(session_id) {
            Some(session) if session.state.can_transition_to(next) => {
                debug!(from = %session.state, to = %next, "session transition");
                session.state = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
