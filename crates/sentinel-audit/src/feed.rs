//! Bounded live fan-out of appended events.
//!
//! Each subscriber owns a bounded `tokio::sync::mpsc` queue.  Publishing
//! never blocks: a full queue drops the event for that subscriber only, and
//! a closed queue is pruned on the next publish.  When the subscriber limit
//! is reached the oldest subscriber is evicted.

use std::{collections::VecDeque, sync::Mutex};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use sentinel_contracts::event::EventSummary;

struct Listener {
    id: u64,
    tx: mpsc::Sender<EventSummary>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: VecDeque<Listener>,
}

pub struct LiveFeed {
    registry: Mutex<Registry>,
    max_listeners: usize,
    buffer: usize,
}

/// The receiving end of one subscription.  Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<EventSummary>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event.  `None` once the feed evicted this
    /// subscription and its queue is drained.
    pub async fn recv(&mut self) -> Option<EventSummary> {
        self.rx.recv().await
    }

    /// The next queued event, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<EventSummary> {
        self.rx.try_recv().ok()
    }

    /// Everything currently queued.
    pub fn drain(&mut self) -> Vec<EventSummary> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl LiveFeed {
    pub fn new(max_listeners: usize, buffer: usize) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            max_listeners: max_listeners.max(1),
            buffer: buffer.max(1),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());

        while registry.listeners.len() >= self.max_listeners {
            if let Some(evicted) = registry.listeners.pop_front() {
                debug!(listener = evicted.id, "live feed full; oldest listener evicted");
            }
        }

        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push_back(Listener { id, tx });
        Subscription { id, rx }
    }

    /// Remove a subscription explicitly.  No-op for unknown ids.
    pub fn unsubscribe(&self, id: u64) {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.listeners.retain(|l| l.id != id);
    }

    /// Offer `summary` to every subscriber.  Returns how many accepted it.
    pub fn publish(&self, summary: &EventSummary) -> usize {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let mut delivered = 0;

        registry.listeners.retain(|listener| match listener.tx.try_send(summary.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(listener = listener.id, event = summary.id, "listener queue full; event dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .listeners
            .len()
    }
}
