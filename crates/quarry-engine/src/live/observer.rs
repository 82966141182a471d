//! Observer registry for live queries

use super::state::LiveState;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

pub(crate) type Callback<T> = Arc<dyn Fn(&LiveState<T>) + Send + Sync>;

pub(crate) struct Observers<T> {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
}

impl<T> Observers<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            callbacks: BTreeMap::new(),
        }
    }
}

pub(crate) type SharedObservers<T> = Arc<Mutex<Observers<T>>>;

pub(crate) fn register<T: 'static>(
    observers: &SharedObservers<T>,
    callback: Callback<T>,
) -> ObserverHandle {
    let id = {
        let mut guard = observers.lock().unwrap_or_else(PoisonError::into_inner);
        let id = guard.next_id;
        guard.next_id += 1;
        guard.callbacks.insert(id, callback);
        id
    };

    let weak: Weak<Mutex<Observers<T>>> = Arc::downgrade(observers);
    ObserverHandle {
        unregister: Some(Box::new(move || {
            if let Some(observers) = weak.upgrade() {
                observers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .callbacks
                    .remove(&id);
            }
        })),
    }
}

/// Deliver `state` to every registered callback in registration order
///
/// Callbacks run outside the registry lock and may unregister themselves.
pub(crate) fn deliver<T>(observers: &SharedObservers<T>, state: &LiveState<T>) {
    let snapshot: Vec<Callback<T>> = observers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .callbacks
        .values()
        .cloned()
        .collect();
    for callback in snapshot {
        callback(state);
    }
}

pub(crate) fn count<T>(observers: &SharedObservers<T>) -> usize {
    observers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .callbacks
        .len()
}

/// Registration of one observer callback
///
/// Dropping the handle unregisters the callback.
#[must_use = "dropping the handle unregisters the observer"]
pub struct ObserverHandle {
    unregister: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ObserverHandle {
    pub fn unregister(mut self) {
        self.release();
    }

    /// Keep the callback registered for the lifetime of the live query
    pub fn detach(mut self) {
        self.unregister = None;
    }

    fn release(&mut self) {
        if let Some(unregister) = self.unregister.take() {
            unregister();
        }
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("registered", &self.unregister.is_some())
            .finish()
    }
}
