//! Form scopes.
//!
//! A [`ScopeNode`] owns one value, its error map, its validator registry and
//! the callbacks hanging off it. The root form is a scope; so is every item
//! of a repeater.

mod config;
mod handlers;
mod node;
mod store;

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

pub use config::{DEFAULT_SCOPE_NAME, ScopeConfig, ScopeValidation};
pub use handlers::{ResetHandler, Subscriber};
pub use node::{ScopeNode, WeakScope};
pub use store::ValueStore;

/// Unique identifier for a scope.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(Uuid);

impl ScopeId {
    /// Create a new unique scope ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable activity of a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopePhase {
    #[default]
    Idle,
    /// At least one `validate` or `validate_field` is in flight.
    Validating,
    /// `reset` is running, including its reset handlers.
    Resetting,
}

/// Plain data handed to render callbacks.
#[derive(Debug, Clone)]
pub struct ScopeSnapshot<T> {
    pub value: Arc<T>,
    /// Displayable errors; the repeater sentinel is stripped.
    pub errors: Option<BTreeMap<String, String>>,
    pub in_process: bool,
    pub phase: ScopePhase,
    /// Bumped on every commit of value or errors.
    pub revision: u64,
}
