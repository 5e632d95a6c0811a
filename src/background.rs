//! Background-execution guard.
//!
//! While a host application is suspended it may grant outstanding work a
//! limited amount of extra time. A connection that opts in asks the guard for
//! a token when it starts and hands it back when it completes or is
//! cancelled. If the host expires the token first, the connection fails with
//! `ConnectionErrorCode::ExpiredInBackground`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one granted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundTaskId(u64);

impl BackgroundTaskId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BackgroundTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bg#{}", self.0)
    }
}

/// Runs at most once, from whatever thread the host expires tokens on.
pub type ExpirationHandler = Box<dyn FnOnce() + Send + 'static>;

/// Platform hook for extending execution while backgrounded.
pub trait BackgroundGuard: Send + Sync {
    fn begin(&self, label: &str, on_expire: ExpirationHandler) -> BackgroundTaskId;

    /// Release a token. Unknown or already expired ids are ignored.
    fn end(&self, id: BackgroundTaskId);
}

struct Grant {
    label: String,
    on_expire: ExpirationHandler,
}

/// A guard whose tokens expire only when the host says so.
///
/// Hosts without a platform facility call [`expire_all`](Self::expire_all)
/// when their grace period runs out.
#[derive(Default)]
pub struct ManualBackgroundGuard {
    next_id: AtomicU64,
    grants: Mutex<HashMap<BackgroundTaskId, Grant>>,
}

impl ManualBackgroundGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.grants.lock().len()
    }

    pub fn is_active(&self, id: BackgroundTaskId) -> bool {
        self.grants.lock().contains_key(&id)
    }

    /// Expire every outstanding token, running their handlers.
    ///
    /// Returns the number of handlers run.
    pub fn expire_all(&self) -> usize {
        let expired: Vec<_> = self.grants.lock().drain().collect();
        let count = expired.len();
        for (id, grant) in expired {
            tracing::warn!(id = %id, label = %grant.label, "background time expired");
            (grant.on_expire)();
        }
        count
    }
}

impl BackgroundGuard for ManualBackgroundGuard {
    fn begin(&self, label: &str, on_expire: ExpirationHandler) -> BackgroundTaskId {
        let id = BackgroundTaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.grants.lock().insert(
            id,
            Grant {
                label: label.to_string(),
                on_expire,
            },
        );
        tracing::trace!(id = %id, label, "background task began");
        id
    }

    fn end(&self, id: BackgroundTaskId) {
        if self.grants.lock().remove(&id).is_some() {
            tracing::trace!(id = %id, "background task ended");
        }
    }
}

impl fmt::Debug for ManualBackgroundGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualBackgroundGuard")
            .field("active", &self.active_count())
            .finish()
    }
}
