//! Bookkeeping of in-flight connections.

use super::{Connection, Inner};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fired when the number of active connections leaves or returns to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Began,
    Ended,
}

/// The set of started, not yet completed or cancelled connections.
///
/// Membership is weak: the registry never keeps a connection alive. Safe to
/// use from any thread.
///
/// The active count, the map and the activity events change together under
/// `active`, so a count is never observed without its entry.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Weak<Inner>>,
    active: Mutex<usize>,
    activity: broadcast::Sender<ActivityEvent>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        let (activity, _) = broadcast::channel(16);
        Self {
            connections: DashMap::new(),
            active: Mutex::new(0),
            activity,
        }
    }

    /// Register `conn`; returns the active count including it.
    pub(crate) fn add(&self, conn: &Connection) -> usize {
        let mut active = self.active.lock();
        if self
            .connections
            .insert(conn.id(), Arc::downgrade(&conn.inner))
            .is_none()
        {
            *active += 1;
            if *active == 1 {
                let _ = self.activity.send(ActivityEvent::Began);
            }
        }
        *active
    }

    /// Deregister by id. Removing an absent id is a no-op.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let mut active = self.active.lock();
        if self.connections.remove(&id).is_none() {
            return false;
        }
        *active -= 1;
        if *active == 0 {
            let _ = self.activity.send(ActivityEvent::Ended);
        }
        true
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        *self.active.lock()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the live connections.
    pub fn connections(&self) -> Vec<Connection> {
        let mut live = Vec::with_capacity(self.connections.len());
        let mut dead = Vec::new();
        for entry in self.connections.iter() {
            match entry.value().upgrade() {
                Some(inner) => live.push(Connection { inner }),
                None => dead.push(*entry.key()),
            }
        }
        // Entries must not be removed while iterating.
        for id in dead {
            self.remove(id);
        }
        live
    }

    /// Cancel every connection in the current snapshot, then drop them from
    /// the set. Connections whose completion is already scheduled still
    /// complete. Returns the snapshot size.
    pub fn cancel_all(&self) -> usize {
        let snapshot = self.connections();
        tracing::debug!(count = snapshot.len(), "cancelling all connections");
        for conn in &snapshot {
            conn.cancel();
        }
        for conn in &snapshot {
            self.remove(conn.id());
        }
        snapshot.len()
    }

    /// Subscribe to activity transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.activity.subscribe()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("active", &self.len())
            .finish()
    }
}
