//! Field bindings.
//!
//! A [`FieldBinding`] connects one value inside a scope's form value to the
//! outside world: it reads and writes the value through caller-supplied
//! accessors and keeps the field's validators registered on the scope while
//! attached.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, trace, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{FormError, Result};
use crate::scope::{ScopeNode, WeakScope};
use crate::sync::lock;
use crate::validation::{
    BoundValidator, FocusTarget, Getter, OnValidateField, OnValidateFn, Validator,
};

/// Pure write of a field value into a copy of the form value.
pub type Setter<T, V> = Arc<dyn Fn(T, V) -> T + Send + Sync>;

/// Rewrites an incoming value given the previous one (masking, casing...).
pub type Formatter<V> = Arc<dyn Fn(&V, V) -> V + Send + Sync>;

/// Configuration of a field binding.
pub struct FieldConfig<T, V> {
    /// Key under which the field reports errors.
    pub name: String,
    pub get: Getter<T, V>,
    pub set: Setter<T, V>,
    /// Checked in order; the first failure wins.
    pub validators: Vec<Validator<V, T>>,
    /// Validate in the background after every `on_change`.
    pub on_change_validation: bool,
    pub on_validate: Option<OnValidateFn<V>>,
    /// Threaded through to `on_validate` untouched.
    pub focus_target: Option<FocusTarget>,
    pub formatter: Option<Formatter<V>>,
}

impl<T, V> fmt::Debug for FieldConfig<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("name", &self.name)
            .field("validators", &self.validators.len())
            .field("on_change_validation", &self.on_change_validation)
            .finish_non_exhaustive()
    }
}

impl<T, V> FieldConfig<T, V> {
    pub fn new(
        name: impl Into<String>,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(T, V) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            get: Arc::new(get),
            set: Arc::new(set),
            validators: Vec::new(),
            on_change_validation: false,
            on_validate: None,
            focus_target: None,
            formatter: None,
        }
    }

    pub fn validator(mut self, validator: Validator<V, T>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator<V, T>>) -> Self {
        self.validators.extend(validators);
        self
    }

    /// Validate after every change.
    pub fn validate_on_change(mut self) -> Self {
        self.on_change_validation = true;
        self
    }

    pub fn on_validate(mut self, f: impl Fn(&OnValidateField<V>) + Send + Sync + 'static) -> Self {
        self.on_validate = Some(Arc::new(f));
        self
    }

    pub fn focus_target(mut self, target: FocusTarget) -> Self {
        self.focus_target = Some(target);
        self
    }

    pub fn formatter(mut self, f: impl Fn(&V, V) -> V + Send + Sync + 'static) -> Self {
        self.formatter = Some(Arc::new(f));
        self
    }
}

/// Plain data handed to a field's render callback.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot<V> {
    pub name: String,
    pub value: V,
    pub error: Option<String>,
    pub in_process: bool,
    /// Revision of the owning scope; changes whenever a re-render may be due.
    pub revision: u64,
}

struct FieldInner<T, V> {
    scope: WeakScope<T>,
    name: String,
    get: Getter<T, V>,
    set: Setter<T, V>,
    formatter: Option<Formatter<V>>,
    on_change_validation: bool,
    validators: Mutex<Vec<Arc<BoundValidator<T>>>>,
    attached: AtomicBool,
}

/// A field attached to a scope.
///
/// Cheap to clone. Dropping a binding does not detach it; call
/// [`detach`](Self::detach) when the field goes away.
pub struct FieldBinding<T, V> {
    inner: Arc<FieldInner<T, V>>,
}

impl<T, V> Clone for FieldBinding<T, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, V> fmt::Debug for FieldBinding<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.inner.name)
            .field("attached", &self.inner.attached.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T, V> FieldBinding<T, V>
where
    T: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Attach a field to `scope`, registering its validators.
    pub fn attach(scope: &ScopeNode<T>, config: FieldConfig<T, V>) -> Self {
        let FieldConfig {
            name,
            get,
            set,
            validators,
            on_change_validation,
            on_validate,
            focus_target,
            formatter,
        } = config;

        let bound: Vec<Arc<BoundValidator<T>>> = validators
            .into_iter()
            .map(|validator| {
                Arc::new(BoundValidator::bind(
                    name.clone(),
                    validator,
                    Arc::clone(&get),
                    on_validate.clone(),
                    focus_target.clone(),
                ))
            })
            .collect();

        for validator in &bound {
            scope.register_validator(Arc::clone(validator));
        }

        debug!(
            "Attached field '{}' to scope '{}' with {} validators",
            name,
            scope.name(),
            bound.len()
        );

        Self {
            inner: Arc::new(FieldInner {
                scope: scope.downgrade(),
                name,
                get,
                set,
                formatter,
                on_change_validation,
                validators: Mutex::new(bound),
                attached: AtomicBool::new(true),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::SeqCst)
    }

    fn scope(&self) -> Result<ScopeNode<T>> {
        self.inner
            .scope
            .upgrade()
            .ok_or_else(|| FormError::ScopeDropped(self.inner.name.clone()))
    }

    /// Current field value.
    pub fn value(&self) -> Result<V> {
        let scope = self.scope()?;
        Ok((self.inner.get)(&scope.value()))
    }

    /// Displayable error for this field.
    pub fn error(&self) -> Result<Option<String>> {
        Ok(self.scope()?.error(&self.inner.name))
    }

    pub fn snapshot(&self) -> Result<FieldSnapshot<V>> {
        let scope = self.scope()?;
        Ok(FieldSnapshot {
            name: self.inner.name.clone(),
            value: (self.inner.get)(&scope.value()),
            error: scope.error(&self.inner.name),
            in_process: scope.in_process(),
            revision: scope.revision(),
        })
    }

    /// Write a new value and notify the scope.
    ///
    /// With on-change validation enabled, validation is spawned on the
    /// current tokio runtime and its handle returned; the caller need not
    /// await it.
    pub fn on_change(&self, value: V) -> Result<Option<JoinHandle<bool>>> {
        let scope = self.scope()?;

        let runtime = if self.inner.on_change_validation {
            Some(
                Handle::try_current()
                    .map_err(|_| FormError::NoRuntime(self.inner.name.clone()))?,
            )
        } else {
            None
        };

        let next = match &self.inner.formatter {
            Some(formatter) => formatter(&(self.inner.get)(&scope.value()), value),
            None => value,
        };

        let set = Arc::clone(&self.inner.set);
        scope.update(move |form| set(form, next));
        trace!("Field '{}' changed", self.inner.name);

        let Some(runtime) = runtime else {
            return Ok(None);
        };

        let binding = self.clone();
        Ok(Some(runtime.spawn(async move {
            match binding.validate().await {
                Ok(is_valid) => is_valid,
                Err(err) => {
                    warn!("Dropped on-change validation of '{}': {}", binding.inner.name, err);
                    false
                }
            }
        })))
    }

    /// Validate this field against the scope's current value.
    pub async fn validate(&self) -> Result<bool> {
        let scope = self.scope()?;
        let validators = lock(&self.inner.validators).clone();
        if validators.is_empty() {
            return Ok(true);
        }
        Ok(scope
            .validate_field(&self.inner.name, scope.value(), &validators)
            .await)
    }

    /// Unregister validators and clear the field's error.
    ///
    /// Detaching from a scope that no longer exists succeeds; there is
    /// nothing left to clean up.
    pub fn detach(&self) {
        if !self.inner.attached.swap(false, Ordering::SeqCst) {
            return;
        }

        let validators = std::mem::take(&mut *lock(&self.inner.validators));
        let Some(scope) = self.inner.scope.upgrade() else {
            return;
        };

        for validator in &validators {
            scope.unregister_validator(validator);
        }
        scope.clear_field(&self.inner.name);

        debug!(
            "Detached field '{}' from scope '{}'",
            self.inner.name,
            scope.name()
        );
    }
}
