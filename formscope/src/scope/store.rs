use std::sync::{Arc, RwLock};

use crate::sync::{read, write};

/// Owns a scope's value and the initial value it resets to.
///
/// Every write installs a fresh `Arc`, so consumers detect changes with
/// `Arc::ptr_eq` instead of comparing contents.
#[derive(Debug)]
pub struct ValueStore<T> {
    initial: T,
    current: RwLock<Arc<T>>,
}

impl<T: Clone> ValueStore<T> {
    /// Create a store holding a clone of `initial`.
    pub fn new(initial: T) -> Self {
        let current = Arc::new(initial.clone());
        Self {
            initial,
            current: RwLock::new(current),
        }
    }

    pub fn get(&self) -> Arc<T> {
        Arc::clone(&read(&self.current))
    }

    pub fn initial(&self) -> &T {
        &self.initial
    }

    /// Install `value` in a fresh container.
    pub fn replace(&self, value: T) -> Arc<T> {
        let next = Arc::new(value);
        *write(&self.current) = Arc::clone(&next);
        next
    }

    /// Apply a pure transform to a copy of the current value.
    pub fn apply(&self, f: impl FnOnce(T) -> T) -> Arc<T> {
        let base = T::clone(&self.get());
        self.replace(f(base))
    }

    /// Install a fresh clone of the initial value.
    pub fn reset(&self) -> Arc<T> {
        self.replace(self.initial.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_installs_fresh_container() {
        let store = ValueStore::new(vec![1, 2]);
        let before = store.get();
        store.replace(vec![1, 2]);
        assert!(!Arc::ptr_eq(&before, &store.get()));
        assert_eq!(*before, *store.get());
    }

    #[test]
    fn test_reset_clones_initial() {
        let store = ValueStore::new(vec![1]);
        store.apply(|mut v| {
            v.push(2);
            v
        });
        assert_eq!(*store.get(), vec![1, 2]);
        store.reset();
        assert_eq!(*store.get(), vec![1]);
        assert_eq!(store.initial(), &vec![1]);
    }
}
