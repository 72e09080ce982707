use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use futures::FutureExt;
use futures::future::BoxFuture;
use log::{debug, trace, warn};

use super::config::RepeaterConfig;
use super::{ItemContext, ItemKey, RepeaterControls, RepeaterItem};
use crate::error::{FormError, Result};
use crate::lift::{Fragment, LiftMessage};
use crate::scope::{ResetHandler, ScopeConfig, ScopeNode, ScopePhase, Subscriber, WeakScope};
use crate::sync::lock;
use crate::validation::{BoundValidator, ErrorValue};

struct RepeaterInner<T, I> {
    config: RepeaterConfig<T, I>,
    parent: WeakScope<T>,
    items: Mutex<Vec<RepeaterItem<I>>>,
    /// Index to focus on the next render.
    focus: Mutex<Option<usize>>,
    registration: OnceLock<Registration<T>>,
    attached: AtomicBool,
}

/// What the repeater registered on its parent.
///
/// The parent owns these and through them the repeater; only weak handles
/// are kept here for unregistering.
struct Registration<T> {
    validator: Weak<BoundValidator<T>>,
    reset_handler: Weak<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>,
    subscriber: Weak<dyn Fn() + Send + Sync>,
}

/// Keeps one child scope per element of an array field.
///
/// The parent sees a single synthetic validator under the repeater's name
/// that fails with [`ErrorValue::ContainsInvalidChild`] while any child is
/// invalid. Per-field errors stay in the child scopes.
///
/// # Example
///
/// ```ignore
/// let items = RepeaterController::attach(&form, RepeaterConfig::new(
///     "items",
///     |order: &Order| order.items.clone(),
///     |mut order, items| {
///         order.items = items;
///         order
///     },
/// ));
///
/// items.append(OrderItem::default(), true)?;
/// for item in items.render().items {
///     // draw item.scope, focus it if item.should_focus
/// }
/// ```
pub struct RepeaterController<T, I> {
    inner: Arc<RepeaterInner<T, I>>,
}

impl<T, I> Clone for RepeaterController<T, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, I> fmt::Debug for RepeaterController<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterController")
            .field("name", &self.inner.config.name)
            .field("size", &lock(&self.inner.items).len())
            .field("attached", &self.inner.attached.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T, I> RepeaterController<T, I>
where
    T: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
{
    /// Attach a repeater to `parent` and create scopes for its current items.
    ///
    /// The parent keeps the repeater alive until [`detach`](Self::detach)
    /// or until the parent itself goes away; the returned handle is only
    /// needed to drive it.
    pub fn attach(parent: &ScopeNode<T>, config: RepeaterConfig<T, I>) -> Self {
        let inner = Arc::new(RepeaterInner {
            config,
            parent: parent.downgrade(),
            items: Mutex::new(Vec::new()),
            focus: Mutex::new(None),
            registration: OnceLock::new(),
            attached: AtomicBool::new(true),
        });

        let for_validate = Arc::clone(&inner);
        let validator = Arc::new(BoundValidator::synthetic(
            inner.config.name.clone(),
            ErrorValue::ContainsInvalidChild,
            move |_form: Arc<T>| {
                let inner = Arc::clone(&for_validate);
                async move { inner.validate_children().await }.boxed()
            },
        ));

        let for_reset = Arc::clone(&inner);
        let reset_handler: ResetHandler = Arc::new(move || {
            let inner = Arc::clone(&for_reset);
            async move { inner.reset_children().await }.boxed()
        });

        let for_sync = Arc::clone(&inner);
        let subscriber: Subscriber = Arc::new(move || RepeaterInner::sync(&for_sync));

        let registration = Registration {
            validator: Arc::downgrade(&validator),
            reset_handler: Arc::downgrade(&reset_handler),
            subscriber: Arc::downgrade(&subscriber),
        };
        if inner.registration.set(registration).is_err() {
            warn!("Repeater '{}' registered twice", inner.config.name);
        }

        parent.register_validator(validator);
        parent.register_reset_handler(reset_handler);
        parent.subscribe(subscriber);
        RepeaterInner::sync(&inner);

        debug!(
            "Attached repeater '{}' to scope '{}' with {} items",
            inner.config.name,
            parent.name(),
            lock(&inner.items).len()
        );

        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::SeqCst)
    }

    /// Number of live child scopes.
    pub fn size(&self) -> usize {
        lock(&self.inner.items).len()
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        lock(&self.inner.items)
            .iter()
            .map(|item| item.key.clone())
            .collect()
    }

    pub fn items(&self) -> Vec<RepeaterItem<I>> {
        lock(&self.inner.items).clone()
    }

    /// Child scope of the item with `key`.
    pub fn scope(&self, key: &ItemKey) -> Option<ScopeNode<I>> {
        lock(&self.inner.items)
            .iter()
            .find(|item| item.key == *key)
            .map(|item| item.scope.clone())
    }

    pub fn append(&self, item: I, focus: bool) -> Result<()> {
        let len = self.values()?.len();
        self.insert(len, item, focus)
    }

    pub fn prepend(&self, item: I, focus: bool) -> Result<()> {
        self.insert(0, item, focus)
    }

    /// Insert `item` at `index`, shifting later items.
    ///
    /// With `focus` set, the next [`render`](Self::render) marks the new
    /// item as the one to focus.
    pub fn insert(&self, index: usize, item: I, focus: bool) -> Result<()> {
        let parent = self.parent()?;
        let mut values = (self.inner.config.get)(&parent.value());
        if index > values.len() {
            return Err(FormError::IndexOutOfBounds {
                name: self.inner.config.name.clone(),
                index,
                len: values.len(),
            });
        }

        values.insert(index, item);
        if focus {
            *lock(&self.inner.focus) = Some(index);
        }

        trace!("Repeater '{}' inserting at {}", self.inner.config.name, index);
        self.inner.commit(&parent, values);
        Ok(())
    }

    /// Remove the item at `index`. Out-of-range indices are ignored.
    pub fn remove(&self, index: usize) -> Result<()> {
        self.remove_many([index])
    }

    /// Remove several items at once. Out-of-range indices are ignored.
    pub fn remove_many(&self, indices: impl IntoIterator<Item = usize>) -> Result<()> {
        let parent = self.parent()?;
        let mut values = (self.inner.config.get)(&parent.value());
        let len = values.len();
        let indices: BTreeSet<usize> = indices.into_iter().filter(|&idx| idx < len).collect();
        if indices.is_empty() {
            return Ok(());
        }

        for idx in indices.iter().rev() {
            values.remove(*idx);
        }

        {
            let mut focus = lock(&self.inner.focus);
            if focus.is_some_and(|idx| idx >= values.len()) {
                *focus = None;
            }
        }

        trace!(
            "Repeater '{}' removing {} items",
            self.inner.config.name,
            indices.len()
        );
        self.inner.commit(&parent, values);
        Ok(())
    }

    /// Exchange two items. Out-of-range indices make this a no-op.
    pub fn swap(&self, a: usize, b: usize) -> Result<()> {
        let parent = self.parent()?;
        let mut values = (self.inner.config.get)(&parent.value());
        if a >= values.len() || b >= values.len() || a == b {
            return Ok(());
        }

        values.swap(a, b);
        trace!("Repeater '{}' swapping {} and {}", self.inner.config.name, a, b);
        self.inner.commit(&parent, values);
        Ok(())
    }

    /// Build the render context for every item.
    ///
    /// A pending focus request is consumed here, so only one render sees it.
    pub fn render(&self) -> RepeaterControls<T, I> {
        let focus = lock(&self.inner.focus).take();
        let items = self.items();
        let size = items.len();

        let items = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| ItemContext {
                idx,
                key: item.key,
                scope: item.scope,
                is_first: idx == 0,
                is_last: idx + 1 == size,
                is_even: idx % 2 == 0,
                is_odd: idx % 2 == 1,
                is_single: size == 1,
                should_focus: focus == Some(idx),
                controller: self.clone(),
            })
            .collect();

        RepeaterControls { size, items }
    }

    /// Validate every child as a child call, then settle the repeater's
    /// entry in the parent.
    pub async fn validate(&self) -> bool {
        let is_valid = self.inner.validate_children().await;
        self.inner.relay(LiftMessage::Validate {
            fragment: Fragment::new(),
            defer_commit: false,
        });
        is_valid
    }

    /// Unregister from the parent, destroy every child and clear the
    /// repeater's entry in the parent's error map.
    pub fn detach(&self) {
        if !self.inner.attached.swap(false, Ordering::SeqCst) {
            return;
        }

        let children = std::mem::take(&mut *lock(&self.inner.items));
        for child in &children {
            child.scope.destroy();
        }

        let Some(parent) = self.inner.parent.upgrade() else {
            return;
        };
        if let Some(registration) = self.inner.registration.get() {
            if let Some(validator) = registration.validator.upgrade() {
                parent.unregister_validator(&validator);
            }
            if let Some(handler) = registration.reset_handler.upgrade() {
                parent.unregister_reset_handler(&handler);
            }
            if let Some(subscriber) = registration.subscriber.upgrade() {
                parent.unsubscribe(&subscriber);
            }
        }
        parent.clear_field(&self.inner.config.name);

        debug!(
            "Detached repeater '{}' from scope '{}'",
            self.inner.config.name,
            parent.name()
        );
    }

    fn parent(&self) -> Result<ScopeNode<T>> {
        self.inner
            .parent
            .upgrade()
            .ok_or_else(|| FormError::ScopeDropped(self.inner.config.name.clone()))
    }

    fn values(&self) -> Result<Vec<I>> {
        let parent = self.parent()?;
        Ok((self.inner.config.get)(&parent.value()))
    }
}

impl<T, I> RepeaterInner<T, I>
where
    T: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
{
    fn key_of(&self, idx: usize, item: &I) -> ItemKey {
        match &self.config.key {
            Some(key) => key(item),
            None => ItemKey::Num(idx as i64),
        }
    }

    fn scopes(&self) -> Vec<ScopeNode<I>> {
        lock(&self.items)
            .iter()
            .map(|item| item.scope.clone())
            .collect()
    }

    fn any_child_invalid(&self) -> bool {
        self.scopes().iter().any(|scope| scope.errors().is_some())
    }

    fn commit(&self, parent: &ScopeNode<T>, values: Vec<I>) {
        let set = Arc::clone(&self.config.set);
        parent.update(move |form| set(form, values));
    }

    /// Bring the child scopes in line with the parent's array.
    ///
    /// Existing keys keep their scope, new keys get a fresh one, and scopes
    /// whose key disappeared are destroyed once the item list is updated.
    /// Items sharing a key are matched to the old scopes in order.
    fn sync(self: &Arc<Self>) {
        if !self.attached.load(Ordering::SeqCst) {
            return;
        }
        let Some(parent) = self.parent.upgrade() else {
            return;
        };
        let values = (self.config.get)(&parent.value());

        let mut created = Vec::new();
        let (removed, changed) = {
            let mut items = lock(&self.items);
            let before: Vec<ItemKey> = items.iter().map(|item| item.key.clone()).collect();
            let mut previous: HashMap<ItemKey, VecDeque<RepeaterItem<I>>> = HashMap::new();
            for item in items.drain(..) {
                previous.entry(item.key.clone()).or_default().push_back(item);
            }

            let mut next: Vec<RepeaterItem<I>> = Vec::with_capacity(values.len());
            for (idx, value) in values.iter().enumerate() {
                let key = self.key_of(idx, value);
                let reused = previous.get_mut(&key).and_then(VecDeque::pop_front);
                let item = match reused {
                    Some(item) => item,
                    None => {
                        if next.iter().any(|item| item.key == key) {
                            warn!(
                                "Repeater '{}' has duplicate item key '{}'",
                                self.config.name, key
                            );
                        }
                        let item = RepeaterItem {
                            scope: self.spawn_child(&key, value.clone()),
                            key,
                        };
                        created.push(item.clone());
                        item
                    }
                };
                next.push(item);
            }

            let changed = before.len() != next.len()
                || before.iter().zip(&next).any(|(key, item)| *key != item.key);
            *items = next;
            (previous.into_values().flatten().collect::<Vec<_>>(), changed)
        };

        let removed_invalid = removed.iter().any(|item| item.scope.errors().is_some());
        for item in &removed {
            item.scope.destroy();
        }
        if removed_invalid && parent.phase() != ScopePhase::Resetting {
            self.relay(LiftMessage::ValidateField {
                fragment: Fragment::new(),
            });
        }

        if let Some(on_mount) = &self.config.on_mount {
            for item in &created {
                on_mount(&item.key, &item.scope);
            }
        }

        if changed {
            debug!(
                "Repeater '{}' synced: {} created, {} removed",
                self.config.name,
                created.len(),
                removed.len()
            );
            if let Some(trigger) = &self.config.trigger_renderer {
                trigger(&RepeaterController {
                    inner: Arc::clone(self),
                });
            }
        }
    }

    fn spawn_child(self: &Arc<Self>, key: &ItemKey, value: I) -> ScopeNode<I> {
        let for_change = Arc::downgrade(self);
        let for_lift = Arc::downgrade(self);
        let change_key = key.clone();

        let config = ScopeConfig::new()
            .named(format!("{}[{}]", self.config.name, key))
            .on_change(move |value: &Arc<I>| {
                if let Some(inner) = for_change.upgrade() {
                    inner.write_back(&change_key, value);
                }
            })
            .parent_lift(move |message| {
                if let Some(inner) = for_lift.upgrade() {
                    inner.relay(message);
                }
            });

        ScopeNode::new(value, config)
    }

    /// Write a child's new value into the parent's array.
    fn write_back(&self, key: &ItemKey, value: &Arc<I>) {
        if !self.attached.load(Ordering::SeqCst) {
            return;
        }
        let Some(parent) = self.parent.upgrade() else {
            return;
        };

        let mut values = (self.config.get)(&parent.value());
        let position = values
            .iter()
            .enumerate()
            .position(|(idx, item)| self.key_of(idx, item) == *key);

        match position {
            Some(idx) => {
                values[idx] = I::clone(value);
                self.commit(&parent, values);
            }
            None => trace!(
                "Repeater '{}' dropped write for missing item '{}'",
                self.config.name, key
            ),
        }
    }

    /// Replace a child's lifted fragment with the repeater's own entry.
    ///
    /// The parent only learns whether some child is invalid; the message
    /// kind and its defer flag pass through unchanged.
    fn relay(&self, message: LiftMessage) {
        let Some(parent) = self.parent.upgrade() else {
            return;
        };

        let marker = self
            .any_child_invalid()
            .then_some(ErrorValue::ContainsInvalidChild);
        trace!(
            "Repeater '{}' relaying child errors (invalid: {})",
            self.config.name,
            marker.is_some()
        );

        parent.lift(message.with_fragment(Fragment::from([(self.config.name.clone(), marker)])));
    }

    async fn validate_children(&self) -> bool {
        let mut is_valid = true;
        for child in self.scopes() {
            if !child.validate(child.value(), true).await {
                is_valid = false;
                if self.config.interrupt {
                    break;
                }
            }
        }
        is_valid
    }

    async fn reset_children(&self) {
        for child in self.scopes() {
            child.reset().await;
        }
    }
}
