use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::sync::lock;

/// Called after every commit on the scope it subscribed to.
pub type Subscriber = Arc<dyn Fn() + Send + Sync>;

/// Called, and awaited, after the owning scope resets.
pub type ResetHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Callback list keyed by `Arc` identity.
pub(crate) struct HandlerList<F: ?Sized> {
    entries: Mutex<Vec<Arc<F>>>,
}

impl<F: ?Sized> HandlerList<F> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, handler: Arc<F>) -> bool {
        let mut entries = lock(&self.entries);
        if entries.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return false;
        }
        entries.push(handler);
        true
    }

    pub(crate) fn remove(&self, handler: &Arc<F>) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|h| !Arc::ptr_eq(h, handler));
        entries.len() != before
    }

    /// Copy of the list; callbacks run without the lock held.
    pub(crate) fn snapshot(&self) -> Vec<Arc<F>> {
        lock(&self.entries).clone()
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub(crate) fn clear(&self) {
        lock(&self.entries).clear();
    }
}
