use std::fmt;
use std::sync::Arc;

use super::{ItemKey, RepeaterController};
use crate::scope::ScopeNode;

pub(crate) type ItemsGetter<T, I> = Arc<dyn Fn(&T) -> Vec<I> + Send + Sync>;
pub(crate) type ItemsSetter<T, I> = Arc<dyn Fn(T, Vec<I>) -> T + Send + Sync>;
pub(crate) type KeyFn<I> = Arc<dyn Fn(&I) -> ItemKey + Send + Sync>;
pub(crate) type TriggerFn<T, I> = Arc<dyn Fn(&RepeaterController<T, I>) + Send + Sync>;
pub(crate) type MountFn<I> = Arc<dyn Fn(&ItemKey, &ScopeNode<I>) + Send + Sync>;

/// Configuration of a repeater.
///
/// # Example
///
/// ```ignore
/// let config = RepeaterConfig::new(
///     "items",
///     |order: &Order| order.items.clone(),
///     |mut order, items| {
///         order.items = items;
///         order
///     },
/// )
/// .key(|item: &OrderItem| ItemKey::from(item.id))
/// .on_mount(|_, scope| {
///     FieldBinding::attach(scope, name_field());
/// });
/// ```
pub struct RepeaterConfig<T, I> {
    /// Key of the repeater in the parent's error map.
    pub name: String,
    pub get: ItemsGetter<T, I>,
    pub set: ItemsSetter<T, I>,
    /// Item identity. Without it items are keyed by position.
    pub key: Option<KeyFn<I>>,
    /// Stop validating children after the first invalid one.
    pub interrupt: bool,
    /// Called after the set of items changes, with the controller to render
    /// add/remove controls from.
    pub trigger_renderer: Option<TriggerFn<T, I>>,
    /// Called when a child scope is created; attach its fields here.
    pub on_mount: Option<MountFn<I>>,
}

impl<T, I> fmt::Debug for RepeaterConfig<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterConfig")
            .field("name", &self.name)
            .field("keyed", &self.key.is_some())
            .field("interrupt", &self.interrupt)
            .finish_non_exhaustive()
    }
}

impl<T, I> RepeaterConfig<T, I> {
    pub fn new(
        name: impl Into<String>,
        get: impl Fn(&T) -> Vec<I> + Send + Sync + 'static,
        set: impl Fn(T, Vec<I>) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            get: Arc::new(get),
            set: Arc::new(set),
            key: None,
            interrupt: false,
            trigger_renderer: None,
            on_mount: None,
        }
    }

    pub fn key(mut self, f: impl Fn(&I) -> ItemKey + Send + Sync + 'static) -> Self {
        self.key = Some(Arc::new(f));
        self
    }

    pub fn interrupt(mut self) -> Self {
        self.interrupt = true;
        self
    }

    pub fn trigger_renderer(
        mut self,
        f: impl Fn(&RepeaterController<T, I>) + Send + Sync + 'static,
    ) -> Self {
        self.trigger_renderer = Some(Arc::new(f));
        self
    }

    pub fn on_mount(mut self, f: impl Fn(&ItemKey, &ScopeNode<I>) + Send + Sync + 'static) -> Self {
        self.on_mount = Some(Arc::new(f));
        self
    }
}
