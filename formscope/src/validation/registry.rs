use std::sync::{Arc, Mutex};

use super::validator::BoundValidator;
use crate::sync::lock;

/// Ordered list of validators active on a scope.
///
/// Entries are compared by pointer, so registering the same `Arc` twice is a
/// no-op and unregistering an absent entry does nothing.
pub struct ValidatorRegistry<T> {
    entries: Mutex<Vec<Arc<BoundValidator<T>>>>,
}

impl<T> ValidatorRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append a validator. Returns `false` if it was already registered.
    pub fn register(&self, validator: Arc<BoundValidator<T>>) -> bool {
        let mut entries = lock(&self.entries);
        if entries.iter().any(|v| Arc::ptr_eq(v, &validator)) {
            return false;
        }
        entries.push(validator);
        true
    }

    /// Remove a validator. Returns `false` if it was not registered.
    pub fn unregister(&self, validator: &Arc<BoundValidator<T>>) -> bool {
        let mut entries = lock(&self.entries);
        match entries.iter().position(|v| Arc::ptr_eq(v, validator)) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Copy of the current list in registration order.
    ///
    /// Validation iterates the copy so validators may attach or detach
    /// while a run is suspended.
    pub fn snapshot(&self) -> Vec<Arc<BoundValidator<T>>> {
        lock(&self.entries).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

impl<T> Default for ValidatorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
