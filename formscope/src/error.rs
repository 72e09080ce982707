//! Error types for structural misuse of the engine.
//!
//! Validation failures are never errors: they are recorded in a scope's
//! [`ErrorMap`](crate::validation::ErrorMap). `FormError` covers wiring bugs
//! that must surface immediately.

use thiserror::Error;

/// Errors returned by scope, field and repeater operations.
#[derive(Debug, Error)]
pub enum FormError {
    /// A binding or controller outlived the scope it was attached to.
    #[error("Scope owning '{0}' is no longer alive")]
    ScopeDropped(String),

    /// A repeater insert targeted a position past the end of the collection.
    #[error("Index {index} is out of bounds for repeater '{name}' with {len} items")]
    IndexOutOfBounds {
        /// Repeater name.
        name: String,
        /// Requested index.
        index: usize,
        /// Current number of items.
        len: usize,
    },

    /// On-change validation was requested outside of a tokio runtime.
    #[error("On-change validation for field '{0}' requires a running tokio runtime")]
    NoRuntime(String),

    /// A `pattern` rule was built from an invalid regular expression.
    #[error("Invalid validation pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The form value could not be rendered as JSON.
    #[error("Failed to serialize form value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FormError>;
