//! Validation primitives for form scopes.
//!
//! A [`Validator`] is a pure rule. Attaching it to a field produces a
//! [`BoundValidator`], which lives in a scope's [`ValidatorRegistry`] until
//! the field detaches. The [`ValidationCoordinator`] runs a registry snapshot
//! against a value and yields a [`ValidationOutcome`].

mod coordinator;
mod registry;
mod result;
pub mod rules;
mod validator;

pub use coordinator::ValidationCoordinator;
pub use registry::ValidatorRegistry;
pub use result::{ErrorMap, ErrorValue, ValidationOutcome};
pub use validator::{
    BoundValidator, CheckFn, FocusTarget, Getter, OnValidateField, OnValidateFn, Validator,
    ValidatorArgs,
};
