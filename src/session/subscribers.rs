use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{error, trace};

use crate::models::SessionState;

type Callback = Arc<dyn Fn(&SessionState) + Send + Sync>;

/// Observer list for session transitions.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback)>>,
}

impl Subscribers {
    pub(crate) fn register(self: &Arc<Self>, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));
        trace!("Registered session subscriber {}", id);
        Subscription {
            id,
            subscribers: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Calls every registered callback with `state`.
    ///
    /// Callbacks run on a snapshot of the list, so they may subscribe or
    /// unsubscribe from inside the call. A panicking callback is logged and
    /// does not stop the others.
    pub(crate) fn notify(&self, state: &SessionState) {
        let snapshot: Vec<(u64, Callback)> = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        trace!("Notifying {} session subscribers", snapshot.len());

        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(state))).is_err() {
                error!("Session subscriber {} panicked while handling '{}'", id, state.kind());
            }
        }
    }
}

/// Handle returned by [`SessionManager::subscribe`](super::SessionManager::subscribe).
///
/// Dropping it keeps the callback registered; call [`Subscription::unsubscribe`]
/// to stop receiving transitions.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns false if the callback was already gone (or the manager was dropped).
    pub fn unsubscribe(self) -> bool {
        match self.subscribers.upgrade() {
            Some(subscribers) => subscribers.remove(self.id),
            None => false,
        }
    }
}
