//! Validator rules and their field-bound form.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};

use super::result::ErrorValue;

/// Arguments handed to a validator method.
#[derive(Debug, Clone)]
pub struct ValidatorArgs<V, T> {
    /// Value extracted from the form by the binding's getter.
    pub field_value: V,
    /// The whole form value the field was extracted from.
    pub form_value: Arc<T>,
}

/// Type alias for validator method closures.
type MethodFn<V, T> = Arc<dyn Fn(ValidatorArgs<V, T>) -> BoxFuture<'static, bool> + Send + Sync>;

/// Extracts a field value from a form value.
pub type Getter<T, V> = Arc<dyn Fn(&T) -> V + Send + Sync>;

/// Callback fired after a bound validator has been evaluated.
pub type OnValidateFn<V> = Arc<dyn Fn(&OnValidateField<V>) + Send + Sync>;

/// Type-erased check of a bound validator against a form value.
pub type CheckFn<T> = Box<dyn Fn(Arc<T>) -> BoxFuture<'static, bool> + Send + Sync>;

/// A declarative validation rule, not bound to any path.
///
/// # Example
///
/// ```ignore
/// let adult = Validator::new("You must be an adult", |age: &u32, _: &Person| *age >= 18);
///
/// let unique = Validator::new_async("Username is taken", |args: ValidatorArgs<String, Signup>| {
///     async move { lookup(&args.field_value).await.is_none() }
/// });
/// ```
pub struct Validator<V, T> {
    method: MethodFn<V, T>,
    message: String,
    interrupt: bool,
}

impl<V, T> Clone for Validator<V, T> {
    fn clone(&self) -> Self {
        Self {
            method: Arc::clone(&self.method),
            message: self.message.clone(),
            interrupt: self.interrupt,
        }
    }
}

impl<V, T> fmt::Debug for Validator<V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("message", &self.message)
            .field("interrupt", &self.interrupt)
            .finish_non_exhaustive()
    }
}

impl<V, T> Validator<V, T>
where
    V: Send + 'static,
    T: Send + Sync + 'static,
{
    /// Create a synchronous rule.
    pub fn new<F>(message: impl Into<String>, f: F) -> Self
    where
        F: Fn(&V, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            method: Arc::new(move |args: ValidatorArgs<V, T>| {
                future::ready(f(&args.field_value, &*args.form_value)).boxed()
            }),
            message: message.into(),
            interrupt: false,
        }
    }

    /// Create an asynchronous rule.
    pub fn new_async<F, Fut>(message: impl Into<String>, f: F) -> Self
    where
        F: Fn(ValidatorArgs<V, T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            method: Arc::new(move |args: ValidatorArgs<V, T>| f(args).boxed()),
            message: message.into(),
            interrupt: false,
        }
    }

    /// Stop evaluating the scope's remaining validators when this one fails.
    pub fn interrupt(mut self) -> Self {
        self.interrupt = true;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_interrupt(&self) -> bool {
        self.interrupt
    }

    /// Evaluate the rule.
    pub fn call(&self, args: ValidatorArgs<V, T>) -> BoxFuture<'static, bool> {
        (self.method)(args)
    }
}

/// Opaque handle threaded through to `on_validate` callbacks.
///
/// The engine never looks inside; consumers use it to focus the widget that
/// failed.
#[derive(Clone)]
pub struct FocusTarget(Arc<dyn Any + Send + Sync>);

impl FocusTarget {
    pub fn new<H: Any + Send + Sync>(handle: H) -> Self {
        Self(Arc::new(handle))
    }

    pub fn downcast_ref<H: Any>(&self) -> Option<&H> {
        self.0.downcast_ref::<H>()
    }
}

impl fmt::Debug for FocusTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FocusTarget(..)")
    }
}

/// Payload of the field-level `on_validate` hook.
#[derive(Debug, Clone)]
pub struct OnValidateField<V> {
    pub is_valid: bool,
    pub field_value: V,
    pub focus_target: Option<FocusTarget>,
}

/// A validator bound to a field path of a scope.
///
/// Identity matters: registries add and remove bound validators by pointer,
/// so keep the `Arc` returned at bind time to unregister it later.
pub struct BoundValidator<T> {
    name: String,
    failure: ErrorValue,
    interrupt: bool,
    check: CheckFn<T>,
}

impl<T> fmt::Debug for BoundValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundValidator")
            .field("name", &self.name)
            .field("failure", &self.failure)
            .field("interrupt", &self.interrupt)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> BoundValidator<T> {
    /// Bind a rule to the field extracted by `get`.
    pub fn bind<V>(
        name: impl Into<String>,
        validator: Validator<V, T>,
        get: Getter<T, V>,
        on_validate: Option<OnValidateFn<V>>,
        focus_target: Option<FocusTarget>,
    ) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        let failure = ErrorValue::Message(validator.message().to_string());
        let interrupt = validator.is_interrupt();

        let check: CheckFn<T> = Box::new(move |form_value: Arc<T>| {
            let field_value = get(&*form_value);
            let pending = validator.call(ValidatorArgs {
                field_value: field_value.clone(),
                form_value,
            });
            let on_validate = on_validate.clone();
            let focus_target = focus_target.clone();

            async move {
                let is_valid = pending.await;
                if let Some(on_validate) = on_validate {
                    on_validate(&OnValidateField {
                        is_valid,
                        field_value,
                        focus_target,
                    });
                }
                is_valid
            }
            .boxed()
        });

        Self {
            name: name.into(),
            failure,
            interrupt,
            check,
        }
    }

    /// Build a validator from a raw check, reporting `failure` when it fails.
    pub fn synthetic<F>(name: impl Into<String>, failure: ErrorValue, check: F) -> Self
    where
        F: Fn(Arc<T>) -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            failure,
            interrupt: false,
            check: Box::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Error value recorded under [`name`](Self::name) on failure.
    pub fn failure(&self) -> &ErrorValue {
        &self.failure
    }

    pub fn is_interrupt(&self) -> bool {
        self.interrupt
    }

    /// Evaluate against a form value, firing `on_validate` if bound.
    pub fn check(&self, form_value: Arc<T>) -> BoxFuture<'static, bool> {
        (self.check)(form_value)
    }
}
