use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::Session;

/// Callback invoked with the current session, or `None` when logged out.
pub type Observer = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(u64, Observer)>,
}

/// Ordered list of observers, notified synchronously in subscription order.
#[derive(Default)]
pub(crate) struct ObserverList {
    registry: Arc<Mutex<Registry>>,
    /// Bumped by every `notify`; an outer fan-out stops once it is stale.
    generation: AtomicU64,
}

impl ObserverList {
    pub(crate) fn add(&self, observer: Observer) -> Subscription {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.push((id, observer));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Call every observer with `state`.
    ///
    /// The registry lock is released before any callback runs, so observers
    /// may subscribe or unsubscribe from inside a notification. If a callback
    /// triggers a newer notification, that one reaches every observer and
    /// the remaining calls of this one are skipped, so no observer is left
    /// holding an outdated state.
    pub(crate) fn notify(&self, state: Option<&Session>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot: Vec<Observer> = self
            .registry
            .lock()
            .observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in snapshot {
            if self.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            observer(state);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.registry.lock().observers.len()
    }
}

/// Handle returned by `SessionManager::subscribe`.
///
/// The observer stays registered for as long as this handle is alive.
#[must_use = "dropping a Subscription unsubscribes its observer"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Stop receiving notifications. Same as dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().observers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
