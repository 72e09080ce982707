//! Hierarchical form state and validation engine.
//!
//! A form is a tree of [`ScopeNode`]s: one root scope plus one scope per item
//! of every [`RepeaterController`]. Each scope owns its value, its error map
//! and the validators attached to it by [`FieldBinding`]s. Validation results
//! travel upward through the lift channel so ancestors stay consistent
//! without re-validating the whole tree on every change.
//!
//! # Example
//!
//! ```ignore
//! use formscope::prelude::*;
//!
//! let form = ScopeNode::new(
//!     Person::default(),
//!     ScopeConfig::new().on_submit(|value: &Arc<Person>| println!("{value:?}")),
//! );
//!
//! let name = FieldBinding::attach(
//!     &form,
//!     FieldConfig::new("name", |p: &Person| p.name.clone(), |mut p, v| {
//!         p.name = v;
//!         p
//!     })
//!     .validator(rules::required("It is required field")),
//! );
//!
//! name.on_change("Alex".to_string())?;
//! form.submit().await;
//! ```

pub mod error;
pub mod field;
pub mod lift;
pub mod repeater;
pub mod scope;
pub mod validation;

mod sync;

pub use error::{FormError, Result};

pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::error::{FormError, Result};
    pub use crate::field::{FieldBinding, FieldConfig, FieldSnapshot};
    pub use crate::lift::{Fragment, LiftHandler, LiftMessage};
    pub use crate::repeater::{
        ItemContext, ItemKey, RepeaterConfig, RepeaterController, RepeaterControls, RepeaterItem,
    };
    pub use crate::scope::{
        DEFAULT_SCOPE_NAME, ScopeConfig, ScopeId, ScopeNode, ScopePhase, ScopeSnapshot,
        ScopeValidation,
    };
    pub use crate::validation::{
        BoundValidator, ErrorMap, ErrorValue, FocusTarget, OnValidateField, ValidationCoordinator,
        ValidationOutcome, Validator, ValidatorArgs, rules,
    };
}
