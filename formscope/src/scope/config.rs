//! Scope configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::lift::{LiftHandler, LiftMessage};
use crate::validation::{ErrorMap, Validator};

/// Name used for scope-level validators when none is configured.
pub const DEFAULT_SCOPE_NAME: &str = "form";

/// Payload of the scope-level `on_validate` callback.
#[derive(Debug, Clone)]
pub struct ScopeValidation<T> {
    /// Value that was validated.
    pub value: Arc<T>,
    /// Committed errors after the run, sentinel included.
    pub errors: Option<ErrorMap>,
    pub is_valid: bool,
}

impl<T> ScopeValidation<T> {
    /// Committed errors without the repeater sentinel.
    pub fn visible_errors(&self) -> BTreeMap<String, String> {
        self.errors.as_ref().map(ErrorMap::visible).unwrap_or_default()
    }
}

pub(crate) type ValueCallback<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;
pub(crate) type ValidateCallback<T> = Arc<dyn Fn(&ScopeValidation<T>) + Send + Sync>;
pub(crate) type UnmountCallback = Arc<dyn Fn() + Send + Sync>;

/// Per-scope configuration.
///
/// # Example
///
/// ```ignore
/// let config = ScopeConfig::new()
///     .named("order")
///     .interrupt()
///     .validator(rules::non_empty("You should add item"))
///     .on_submit(|order: &Arc<Order>| send(order));
/// ```
pub struct ScopeConfig<T> {
    /// Key under which scope-level validators report.
    pub name: Option<String>,

    /// Stop a validate run at the first failing validator.
    pub interrupt: bool,

    /// Validators over the whole value, registered at creation.
    pub validators: Vec<Validator<T, T>>,

    /// Called with the new value after every `modify`.
    pub on_change: Option<ValueCallback<T>>,

    /// Called after every `validate` and `validate_field`.
    pub on_validate: Option<ValidateCallback<T>>,

    /// Called by `submit` when validation passes.
    pub on_submit: Option<ValueCallback<T>>,

    /// Called once when the scope is destroyed.
    pub on_unmount: Option<UnmountCallback>,

    /// Parent lift endpoint. `None` makes the scope terminal.
    pub parent_lift: Option<LiftHandler>,
}

impl<T> Default for ScopeConfig<T> {
    fn default() -> Self {
        Self {
            name: None,
            interrupt: false,
            validators: Vec::new(),
            on_change: None,
            on_validate: None,
            on_submit: None,
            on_unmount: None,
            parent_lift: None,
        }
    }
}

impl<T> fmt::Debug for ScopeConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeConfig")
            .field("name", &self.name)
            .field("interrupt", &self.interrupt)
            .field("validators", &self.validators.len())
            .field("terminal", &self.parent_lift.is_none())
            .finish_non_exhaustive()
    }
}

impl<T> ScopeConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scope name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Stop validation at the first failure.
    pub fn interrupt(mut self) -> Self {
        self.interrupt = true;
        self
    }

    /// Add a scope-level validator.
    pub fn validator(mut self, validator: Validator<T, T>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn on_change(mut self, f: impl Fn(&Arc<T>) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(f));
        self
    }

    pub fn on_validate(mut self, f: impl Fn(&ScopeValidation<T>) + Send + Sync + 'static) -> Self {
        self.on_validate = Some(Arc::new(f));
        self
    }

    pub fn on_submit(mut self, f: impl Fn(&Arc<T>) + Send + Sync + 'static) -> Self {
        self.on_submit = Some(Arc::new(f));
        self
    }

    pub fn on_unmount(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_unmount = Some(Arc::new(f));
        self
    }

    /// Forward lifts to a parent scope instead of merging locally.
    pub fn parent_lift(mut self, handler: impl Fn(LiftMessage) + Send + Sync + 'static) -> Self {
        self.parent_lift = Some(Arc::new(handler));
        self
    }
}
