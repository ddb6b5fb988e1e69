//! Publish/subscribe of committed engine state changes.
//!
//! Listeners are registered by id in a concurrent map. Emission takes a
//! snapshot of the registered listeners first and calls them with no lock
//! held, so a listener may subscribe, unsubscribe or read engine state.

use crate::{Collection, SyncState};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by `subscribe`, used to unsubscribe.
pub type ListenerId = u64;

/// Listener callback.
pub type Listener = dyn Fn(&EngineEvent) + Send + Sync;

/// A committed state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// One of the status flags changed.
    Status(SyncState),
    /// One collection was replaced by a mutation, a batch or a rollback.
    Collection(Collection),
    /// A full sync replaced the whole snapshot.
    Snapshot,
}

/// Registry of listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: DashMap<ListenerId, Arc<Listener>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: impl Fn(&EngineEvent) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Call every registered listener with `event`.
    pub fn emit(&self, event: &EngineEvent) {
        let listeners: Vec<Arc<Listener>> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
