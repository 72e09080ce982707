use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use futures::future::BoxFuture;
use log::{debug, trace};
use serde::Serialize;

use super::config::{
    DEFAULT_SCOPE_NAME, ScopeConfig, ScopeValidation, UnmountCallback, ValidateCallback,
    ValueCallback,
};
use super::handlers::{HandlerList, ResetHandler, Subscriber};
use super::store::ValueStore;
use super::{ScopeId, ScopePhase, ScopeSnapshot};
use crate::error::Result;
use crate::lift::{self, Fragment, LiftAccumulator, LiftHandler, LiftMessage};
use crate::sync::{lock, read, write};
use crate::validation::{BoundValidator, ErrorMap, ValidationCoordinator, ValidatorRegistry};

/// Where a scope's lifted fragments go.
enum LiftEndpoint {
    /// No parent: merge locally.
    Terminal(Mutex<LiftAccumulator>),
    /// Hand everything to the parent.
    Forward(LiftHandler),
}

struct ScopeInner<T> {
    id: ScopeId,
    name: String,
    coordinator: ValidationCoordinator,
    store: ValueStore<T>,
    errors: RwLock<Option<ErrorMap>>,
    registry: ValidatorRegistry<T>,
    reset_handlers: HandlerList<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>,
    subscribers: HandlerList<dyn Fn() + Send + Sync>,
    endpoint: LiftEndpoint,
    revision: AtomicU64,
    validating: AtomicUsize,
    resetting: AtomicBool,
    destroyed: AtomicBool,
    on_change: Option<ValueCallback<T>>,
    on_validate: Option<ValidateCallback<T>>,
    on_submit: Option<ValueCallback<T>>,
    on_unmount: Option<UnmountCallback>,
}

/// Counts an in-flight validation for as long as it lives.
struct Validating<'a>(&'a AtomicUsize);

impl<'a> Validating<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Validating<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds the resetting flag up for as long as it lives.
struct Resetting<'a>(&'a AtomicBool);

impl<'a> Resetting<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for Resetting<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One node of the form tree.
///
/// `ScopeNode` is a cheap handle; clones share the same scope. Children hold
/// a [`WeakScope`] to their parent so the tree never forms a cycle.
///
/// # Example
///
/// ```ignore
/// let form = ScopeNode::new(Signup::default(), ScopeConfig::new().named("signup"));
///
/// form.update(|mut s| {
///     s.email = "alex@example.com".into();
///     s
/// });
///
/// if form.validate(form.value(), false).await {
///     // ...
/// }
/// ```
pub struct ScopeNode<T> {
    inner: Arc<ScopeInner<T>>,
}

impl<T> Clone for ScopeNode<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ScopeNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeNode")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("revision", &self.inner.revision.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to a scope.
pub struct WeakScope<T> {
    inner: Weak<ScopeInner<T>>,
}

impl<T> Clone for WeakScope<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakScope<T> {
    pub fn upgrade(&self) -> Option<ScopeNode<T>> {
        self.inner.upgrade().map(|inner| ScopeNode { inner })
    }
}

impl<T> ScopeNode<T> {
    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Check if two handles refer to the same scope.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn downgrade(&self) -> WeakScope<T> {
        WeakScope {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Committed errors, sentinel included.
    pub fn errors(&self) -> Option<ErrorMap> {
        read(&self.inner.errors).clone()
    }

    /// Displayable error for one key.
    pub fn error(&self, name: &str) -> Option<String> {
        read(&self.inner.errors)
            .as_ref()
            .and_then(|errors| errors.message(name).map(str::to_string))
    }

    /// Committed errors without the repeater sentinel.
    pub fn visible_errors(&self) -> Option<BTreeMap<String, String>> {
        read(&self.inner.errors)
            .as_ref()
            .map(ErrorMap::visible)
            .filter(|visible| !visible.is_empty())
    }

    pub fn phase(&self) -> ScopePhase {
        if self.inner.resetting.load(Ordering::SeqCst) {
            ScopePhase::Resetting
        } else if self.inner.validating.load(Ordering::SeqCst) > 0 {
            ScopePhase::Validating
        } else {
            ScopePhase::Idle
        }
    }

    /// Whether a validation is in flight.
    pub fn in_process(&self) -> bool {
        self.inner.validating.load(Ordering::SeqCst) > 0
    }

    /// Monotonic commit counter of this scope.
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.inner.endpoint, LiftEndpoint::Terminal(_))
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Number of deferred fragments waiting for a terminal merge.
    pub fn pending_lifts(&self) -> usize {
        match &self.inner.endpoint {
            LiftEndpoint::Terminal(accumulator) => lock(accumulator).len(),
            LiftEndpoint::Forward(_) => 0,
        }
    }

    pub fn register_validator(&self, validator: Arc<BoundValidator<T>>) {
        if self.inner.registry.register(validator) {
            trace!("Scope '{}' registered validator", self.inner.name);
        }
    }

    pub fn unregister_validator(&self, validator: &Arc<BoundValidator<T>>) {
        if self.inner.registry.unregister(validator) {
            trace!("Scope '{}' unregistered validator", self.inner.name);
        }
    }

    /// Active validators in registration order.
    pub fn validators(&self) -> Vec<Arc<BoundValidator<T>>> {
        self.inner.registry.snapshot()
    }

    pub fn register_reset_handler(&self, handler: ResetHandler) {
        self.inner.reset_handlers.add(handler);
    }

    pub fn unregister_reset_handler(&self, handler: &ResetHandler) {
        self.inner.reset_handlers.remove(handler);
    }

    pub fn reset_handler_count(&self) -> usize {
        self.inner.reset_handlers.len()
    }

    pub fn subscribe(&self, subscriber: Subscriber) {
        self.inner.subscribers.add(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: &Subscriber) {
        self.inner.subscribers.remove(subscriber);
    }

    /// A lift handler delivering into this scope, for use as a child's
    /// `parent_lift`.
    pub fn lift_handler(&self) -> LiftHandler
    where
        T: Send + Sync + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                ScopeNode { inner }.lift(message);
            }
        })
    }

    /// Deliver a lifted message to this scope.
    ///
    /// A terminal scope buffers deferred `Validate` fragments and merges
    /// everything else into its map, committing only when the map changes.
    /// A forwarding scope passes every message on unchanged, first merging
    /// non-deferred fragments into its own map so it stays consistent with
    /// what its ancestors see.
    pub fn lift(&self, message: LiftMessage) {
        if self.is_destroyed() {
            return;
        }

        match &self.inner.endpoint {
            LiftEndpoint::Forward(parent) => {
                let deferred = matches!(
                    message,
                    LiftMessage::Validate {
                        defer_commit: true,
                        ..
                    }
                );
                if !deferred {
                    self.apply_fragment(message.fragment().clone());
                }
                parent(message);
            }
            LiftEndpoint::Terminal(accumulator) => match message {
                LiftMessage::Validate {
                    fragment,
                    defer_commit: true,
                } => {
                    trace!("Scope '{}' buffered lifted fragment", self.inner.name);
                    lock(accumulator).push(fragment);
                }
                LiftMessage::Validate {
                    fragment,
                    defer_commit: false,
                } => {
                    let combined = lock(accumulator).drain_with(fragment);
                    self.apply_fragment(combined);
                }
                LiftMessage::ValidateField { fragment } => {
                    self.apply_fragment(fragment);
                }
            },
        }
    }

    /// Remove a key from the map, and from every ancestor it was lifted to.
    pub fn clear_field(&self, name: &str) {
        self.lift(LiftMessage::ValidateField {
            fragment: Fragment::from([(name.to_string(), None)]),
        });
    }

    /// Drop every validator, handler and subscriber and fire `on_unmount`.
    ///
    /// Destroying twice is a no-op.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.registry.clear();
        self.inner.reset_handlers.clear();
        self.inner.subscribers.clear();
        if let LiftEndpoint::Terminal(accumulator) = &self.inner.endpoint {
            lock(accumulator).clear();
        }

        debug!("Destroyed scope '{}' ({})", self.inner.name, self.inner.id);

        if let Some(on_unmount) = &self.inner.on_unmount {
            on_unmount();
        }
    }

    fn notify(&self) {
        let subscribers = self.inner.subscribers.snapshot();
        trace!(
            "Scope '{}' notifying {} subscribers",
            self.inner.name,
            subscribers.len()
        );
        for subscriber in subscribers {
            subscriber();
        }
    }

    /// Commit a new error map if it differs from the current one.
    fn commit_errors(&self, next: Option<ErrorMap>) -> bool {
        let next = next.and_then(ErrorMap::into_option);
        {
            let mut errors = write(&self.inner.errors);
            if *errors == next {
                return false;
            }
            *errors = next;
        }

        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Scope '{}' committed errors (revision {})",
            self.inner.name, revision
        );
        self.notify();
        true
    }

    fn apply_fragment(&self, fragment: Fragment) -> bool {
        let next = lift::apply(self.errors().as_ref(), fragment);
        self.commit_errors(next)
    }

    fn emit_validate(&self, value: Arc<T>, is_valid: bool) {
        if let Some(on_validate) = &self.inner.on_validate {
            on_validate(&ScopeValidation {
                value,
                errors: self.errors(),
                is_valid,
            });
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ScopeNode<T> {
    /// Create a scope owning a clone of `initial`.
    pub fn new(initial: T, config: ScopeConfig<T>) -> Self {
        let ScopeConfig {
            name,
            interrupt,
            validators,
            on_change,
            on_validate,
            on_submit,
            on_unmount,
            parent_lift,
        } = config;

        let name = name.unwrap_or_else(|| DEFAULT_SCOPE_NAME.to_string());

        let registry = ValidatorRegistry::new();
        for validator in validators {
            registry.register(Arc::new(BoundValidator::bind(
                name.clone(),
                validator,
                Arc::new(|value: &T| value.clone()),
                None,
                None,
            )));
        }

        let endpoint = match parent_lift {
            Some(parent) => LiftEndpoint::Forward(parent),
            None => LiftEndpoint::Terminal(Mutex::new(LiftAccumulator::new())),
        };

        let inner = ScopeInner {
            id: ScopeId::new(),
            name,
            coordinator: ValidationCoordinator::new(interrupt),
            store: ValueStore::new(initial),
            errors: RwLock::new(None),
            registry,
            reset_handlers: HandlerList::new(),
            subscribers: HandlerList::new(),
            endpoint,
            revision: AtomicU64::new(0),
            validating: AtomicUsize::new(0),
            resetting: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            on_change,
            on_validate,
            on_submit,
            on_unmount,
        };

        debug!("Created scope '{}' ({})", inner.name, inner.id);

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Current value. No side effects.
    pub fn value(&self) -> Arc<T> {
        self.inner.store.get()
    }

    /// Value the scope was created with and resets to.
    pub fn initial_value(&self) -> &T {
        self.inner.store.initial()
    }

    pub fn snapshot(&self) -> ScopeSnapshot<T> {
        ScopeSnapshot {
            value: self.value(),
            errors: self.visible_errors(),
            in_process: self.in_process(),
            phase: self.phase(),
            revision: self.revision(),
        }
    }

    /// Replace the value and notify. Does not validate.
    pub fn modify(&self, value: T) {
        if self.is_destroyed() {
            trace!("Ignoring modify on destroyed scope '{}'", self.inner.name);
            return;
        }
        let value = self.inner.store.replace(value);
        self.committed_value(value);
    }

    /// Replace the value with `f` applied to a copy of it.
    pub fn update(&self, f: impl FnOnce(T) -> T) {
        if self.is_destroyed() {
            trace!("Ignoring update on destroyed scope '{}'", self.inner.name);
            return;
        }
        let value = self.inner.store.apply(f);
        self.committed_value(value);
    }

    fn committed_value(&self, value: Arc<T>) {
        self.inner.revision.fetch_add(1, Ordering::SeqCst);
        self.notify();
        if let Some(on_change) = &self.inner.on_change {
            on_change(&value);
        }
    }

    /// Run every registered validator against `value`.
    ///
    /// A child call commits this scope's errors immediately and lifts them
    /// deferred. An outermost call yields one scheduler tick, then merges
    /// whatever descendants lifted under keys none of its own validators
    /// cover and commits once.
    pub async fn validate(&self, value: Arc<T>, is_child_call: bool) -> bool {
        if self.is_destroyed() {
            return true;
        }

        let _validating = Validating::enter(&self.inner.validating);
        let validators = self.inner.registry.snapshot();
        let outcome = self.inner.coordinator.run(&validators, Arc::clone(&value)).await;

        trace!(
            "Scope '{}' validated {} validators (valid: {})",
            self.inner.name,
            validators.len(),
            outcome.is_valid
        );

        match &self.inner.endpoint {
            LiftEndpoint::Terminal(accumulator) => {
                if !is_child_call {
                    tokio::task::yield_now().await;
                }
                // Keys this run evaluated take its result over anything lifted.
                let evaluated: BTreeSet<&str> = validators.iter().map(|v| v.name()).collect();
                let mut combined = lock(accumulator).drain_with(Fragment::new());
                combined.retain(|key, _| !evaluated.contains(key.as_str()));
                combined.extend(lift::fragment_of(outcome.errors.as_ref()));
                self.commit_errors(lift::materialize(combined));
            }
            LiftEndpoint::Forward(parent) => {
                if !is_child_call {
                    tokio::task::yield_now().await;
                }
                let previous = self.errors();
                if self.commit_errors(outcome.errors.clone()) {
                    parent(LiftMessage::Validate {
                        fragment: lift::diff(previous.as_ref(), outcome.errors.as_ref()),
                        defer_commit: is_child_call,
                    });
                }
            }
        }

        self.emit_validate(value, outcome.is_valid);
        outcome.is_valid
    }

    /// Run one field's validators and merge the result into the map.
    ///
    /// The first failing validator's message wins. The field's entry is
    /// lifted so ancestors stay consistent; nothing is committed when the
    /// merged map is unchanged.
    pub async fn validate_field(
        &self,
        name: &str,
        value: Arc<T>,
        validators: &[Arc<BoundValidator<T>>],
    ) -> bool {
        if self.is_destroyed() {
            return true;
        }

        let _validating = Validating::enter(&self.inner.validating);
        let failure = ValidationCoordinator::first_failure(validators, Arc::clone(&value)).await;
        let is_valid = failure.is_none();

        trace!(
            "Scope '{}' validated field '{}' (valid: {})",
            self.inner.name, name, is_valid
        );

        self.lift(LiftMessage::ValidateField {
            fragment: Fragment::from([(name.to_string(), failure)]),
        });
        self.emit_validate(value, is_valid);
        is_valid
    }

    /// Validate the current value and hand it to `on_submit` if valid.
    ///
    /// Returns whether the submit callback ran.
    pub async fn submit(&self) -> bool {
        if !self.validate(self.value(), false).await {
            debug!("Submit of scope '{}' blocked by errors", self.inner.name);
            return false;
        }

        if let Some(on_submit) = &self.inner.on_submit {
            on_submit(&self.value());
        }
        true
    }

    /// Clear errors, restore a fresh clone of the initial value, then after
    /// one scheduler tick run every reset handler.
    pub async fn reset(&self) {
        if self.is_destroyed() {
            return;
        }

        let _resetting = Resetting::enter(&self.inner.resetting);

        if let LiftEndpoint::Terminal(accumulator) = &self.inner.endpoint {
            lock(accumulator).clear();
        }
        *write(&self.inner.errors) = None;
        let value = self.inner.store.reset();
        debug!("Scope '{}' reset", self.inner.name);
        self.committed_value(value);

        tokio::task::yield_now().await;

        for handler in self.inner.reset_handlers.snapshot() {
            handler().await;
        }
    }
}

impl<T: Clone + Serialize + Send + Sync + 'static> ScopeNode<T> {
    /// Current value as pretty-printed JSON.
    pub fn debug_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.value())?)
    }
}
