//! Audit persistence.
//!
//! An `AuditStore` assigns ids and timestamps and keeps events in id order.
//! Chaining and signing happen in [`EventLog`](crate::log::EventLog); the
//! store only has to report the newest `hash_prev` and append.
//!
//! - `InMemoryAuditStore` : reference store for tests and demos.
//! - `JsonlAuditStore` : one JSON object per line, synced on every append.
//!   Reopening a file restores the next id and tail hash, so the chain
//!   continues across restarts.  A failed append is truncated away, and an
//!   unterminated last line left by a crash is dropped on open.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, error, info, warn};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    event::{AuditEvent, EventContext},
};
use sentinel_core::clock::Clock;

/// A signed, chained event that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub event_name: String,
    pub actor_uid: Option<String>,
    pub source: Option<String>,
    pub context: EventContext,
    pub signature: String,
    pub hash_prev: String,
}

impl PendingEvent {
    fn into_event(self, id: u64, clock: &dyn Clock) -> AuditEvent {
        AuditEvent {
            id,
            timestamp: clock.now(),
            event_name: self.event_name,
            actor_uid: self.actor_uid,
            source: self.source,
            context: self.context,
            signature: self.signature,
            hash_prev: self.hash_prev,
        }
    }
}

/// Durable, append-only event storage.
pub trait AuditStore: Send + Sync {
    /// `hash_prev` of the highest-id event, or `None` for an empty log.
    fn last_hash(&self) -> SentinelResult<Option<String>>;

    /// Persist `event` under the next id and return the stored row.
    fn insert(&self, event: PendingEvent) -> SentinelResult<AuditEvent>;

    /// Every event in id order.
    fn all(&self) -> SentinelResult<Vec<AuditEvent>>;

    /// Up to `limit` events, newest first.
    fn recent(&self, limit: usize) -> SentinelResult<Vec<AuditEvent>> {
        let mut events = self.all()?;
        events.reverse();
        events.truncate(limit);
        Ok(events)
    }
}

fn lock_err<E>(_: E) -> SentinelError {
    SentinelError::PersistenceFailed {
        reason: "audit store lock poisoned".to_string(),
    }
}

// ── In memory ─────────────────────────────────────────────────────────────────

pub struct InMemoryAuditStore {
    events: Mutex<Vec<AuditEvent>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAuditStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditStore for InMemoryAuditStore {
    fn last_hash(&self) -> SentinelResult<Option<String>> {
        let events = self.events.lock().map_err(lock_err)?;
        Ok(events.last().map(|e| e.hash_prev.clone()))
    }

    fn insert(&self, event: PendingEvent) -> SentinelResult<AuditEvent> {
        let mut events = self.events.lock().map_err(lock_err)?;
        let id = events.last().map_or(1, |e| e.id + 1);
        let stored = event.into_event(id, self.clock.as_ref());
        events.push(stored.clone());
        Ok(stored)
    }

    fn all(&self) -> SentinelResult<Vec<AuditEvent>> {
        Ok(self.events.lock().map_err(lock_err)?.clone())
    }

    fn recent(&self, limit: usize) -> SentinelResult<Vec<AuditEvent>> {
        let events = self.events.lock().map_err(lock_err)?;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }
}

// ── JSON lines ────────────────────────────────────────────────────────────────

struct JsonlTail {
    file: File,
    /// File length after the last complete line.
    len: u64,
    next_id: u64,
    last_hash: Option<String>,
}

impl JsonlTail {
    fn append(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line)?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.len += line.len() as u64;
        Ok(())
    }

    /// Cut the file back to the last complete line.
    fn rollback(&mut self) -> io::Result<()> {
        self.file.set_len(self.len)?;
        self.file.sync_data()
    }
}

/// Truncate an unterminated final line and return the resulting length.
fn drop_torn_tail(path: &Path) -> SentinelResult<u64> {
    let io_err = |e: io::Error| SentinelError::PersistenceFailed {
        reason: format!("failed to repair audit log '{}': {}", path.display(), e),
    };
    let bytes = std::fs::read(path).map_err(io_err)?;
    if matches!(bytes.last(), None | Some(b'\n')) {
        return Ok(bytes.len() as u64);
    }

    let keep = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1) as u64;
    warn!(
        path = %path.display(),
        dropped_bytes = bytes.len() as u64 - keep,
        "dropping unterminated last line of audit log"
    );
    let file = OpenOptions::new().write(true).open(path).map_err(io_err)?;
    file.set_len(keep).map_err(io_err)?;
    file.sync_data().map_err(io_err)?;
    Ok(keep)
}

/// An append-only JSON-lines file.
pub struct JsonlAuditStore {
    path: PathBuf,
    tail: Mutex<JsonlTail>,
    clock: Arc<dyn Clock>,
}

impl JsonlAuditStore {
    /// Open or create the log at `path` and restore its tail.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> SentinelResult<Self> {
        let path = path.into();
        let (existing, len) = if path.exists() {
            let len = drop_torn_tail(&path)?;
            (read_events(&path)?, len)
        } else {
            (Vec::new(), 0)
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SentinelError::PersistenceFailed {
                reason: format!("failed to open audit log '{}': {}", path.display(), e),
            })?;

        let tail = JsonlTail {
            file,
            len,
            next_id: existing.last().map_or(1, |e| e.id + 1),
            last_hash: existing.last().map(|e| e.hash_prev.clone()),
        };
        info!(
            path = %path.display(),
            events = existing.len(),
            next_id = tail.next_id,
            "audit log opened"
        );

        Ok(Self {
            path,
            tail: Mutex::new(tail),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_tail(&self) -> SentinelResult<MutexGuard<'_, JsonlTail>> {
        self.tail.lock().map_err(lock_err)
    }
}

impl AuditStore for JsonlAuditStore {
    fn last_hash(&self) -> SentinelResult<Option<String>> {
        Ok(self.lock_tail()?.last_hash.clone())
    }

    fn insert(&self, event: PendingEvent) -> SentinelResult<AuditEvent> {
        let mut tail = self.lock_tail()?;
        let stored = event.into_event(tail.next_id, self.clock.as_ref());

        let mut line = serde_json::to_string(&stored).map_err(|e| SentinelError::PersistenceFailed {
            reason: format!("failed to serialize event {}: {}", stored.id, e),
        })?;
        line.push('\n');

        if let Err(e) = tail.append(line.as_bytes()) {
            if let Err(cut) = tail.rollback() {
                error!(path = %self.path.display(), error = %cut, "could not truncate partial audit line");
            }
            return Err(SentinelError::PersistenceFailed {
                reason: format!("failed to append to '{}': {}", self.path.display(), e),
            });
        }

        tail.next_id = stored.id + 1;
        tail.last_hash = Some(stored.hash_prev.clone());
        debug!(id = stored.id, event = %stored.event_name, "audit event persisted");
        Ok(stored)
    }

    fn all(&self) -> SentinelResult<Vec<AuditEvent>> {
        // Hold the tail so no append lands between lines.
        let _tail = self.lock_tail()?;
        read_events(&self.path)
    }
}

/// Read every event of a JSON-lines log.  Blank lines are skipped.
///
/// # Errors
///
/// `PersistenceFailed` on I/O errors or a line that is not an event.
pub fn read_events(path: &Path) -> SentinelResult<Vec<AuditEvent>> {
    let file = File::open(path).map_err(|e| SentinelError::PersistenceFailed {
        reason: format!("failed to open audit log '{}': {}", path.display(), e),
    })?;

    let mut events = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| SentinelError::PersistenceFailed {
            reason: format!("failed to read '{}': {}", path.display(), e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event: AuditEvent = serde_json::from_str(&line).map_err(|e| SentinelError::PersistenceFailed {
            reason: format!("line {} of '{}' is not an audit event: {}", idx + 1, path.display(), e),
        })?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use std::{fs::OpenOptions, io::Write, sync::Arc};

    use chrono::Utc;
    use serde_json::json;

    use sentinel_core::clock::SystemClock;

    use super::{read_events, AuditStore, InMemoryAuditStore, JsonlAuditStore, PendingEvent};

    fn pending(name: &str, hash: &str) -> PendingEvent {
        PendingEvent {
            event_name: name.to_string(),
            actor_uid: Some("EMP-1".to_string()),
            source: None,
            context: json!({ "k": 1 }).as_object().unwrap().clone(),
            signature: "c2ln".to_string(),
            hash_prev: hash.to_string(),
        }
    }

    #[test]
    fn ids_start_at_one_and_recent_is_newest_first() {
        let store = InMemoryAuditStore::new(Arc::new(SystemClock));
        assert_eq!(store.last_hash().unwrap(), None);

        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let stored = store.insert(pending(name, &format!("h{}", i))).unwrap();
            assert_eq!(stored.id, i as u64 + 1);
        }

        assert_eq!(store.last_hash().unwrap().as_deref(), Some("h2"));
        let recent: Vec<u64> = store.recent(2).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(recent, vec![3, 2]);
    }

    #[test]
    fn jsonl_store_restores_its_tail_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let store = JsonlAuditStore::open(&path, Arc::new(SystemClock)).unwrap();
            store.insert(pending("a", "h1")).unwrap();
            store.insert(pending("b", "h2")).unwrap();
        }

        let store = JsonlAuditStore::open(&path, Arc::new(SystemClock)).unwrap();
        assert_eq!(store.last_hash().unwrap().as_deref(), Some("h2"));
        let third = store.insert(pending("c", "h3")).unwrap();
        assert_eq!(third.id, 3);
        assert!(third.timestamp <= Utc::now());

        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].event_name, "c");
        assert_eq!(store.recent(1).unwrap()[0].id, 3);
    }

    #[test]
    fn garbage_line_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();

        let err = JsonlAuditStore::open(&path, Arc::new(SystemClock)).err().unwrap();
        assert!(err.to_string().contains("line 1"), "got {}", err);
    }

    #[test]
    fn rollback_discards_a_partial_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let store = JsonlAuditStore::open(&path, Arc::new(SystemClock)).unwrap();
        store.insert(pending("a", "h1")).unwrap();

        {
            let mut tail = store.lock_tail().unwrap();
            tail.file.write_all(b"{\"id\":2,\"event_na").unwrap();
            tail.rollback().unwrap();
        }
        store.insert(pending("b", "h2")).unwrap();

        let reopened = JsonlAuditStore::open(&path, Arc::new(SystemClock)).unwrap();
        let names: Vec<String> = reopened.all().unwrap().into_iter().map(|e| e.event_name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn torn_last_line_is_dropped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let store = JsonlAuditStore::open(&path, Arc::new(SystemClock)).unwrap();
            store.insert(pending("a", "h1")).unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"id\":2,\"tim").unwrap();
        drop(file);

        let store = JsonlAuditStore::open(&path, Arc::new(SystemClock)).unwrap();
        assert_eq!(store.last_hash().unwrap().as_deref(), Some("h1"));
        assert_eq!(store.insert(pending("b", "h2")).unwrap().id, 2);
        assert_eq!(read_events(&path).unwrap().len(), 2);
    }
}
