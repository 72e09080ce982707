use std::sync::Arc;

use log::trace;

use super::result::{ErrorMap, ErrorValue, ValidationOutcome};
use super::validator::BoundValidator;

/// Runs bound validators against a form value.
///
/// Validators are awaited one at a time in registration order. A field keeps
/// the first failure registered under its name. With `interrupt` set (on the
/// coordinator or on the failing validator) evaluation stops at the first
/// failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationCoordinator {
    interrupt: bool,
}

impl ValidationCoordinator {
    pub fn new(interrupt: bool) -> Self {
        Self { interrupt }
    }

    /// Evaluate every validator and collect the outcome.
    pub async fn run<T: Send + Sync + 'static>(
        &self,
        validators: &[Arc<BoundValidator<T>>],
        value: Arc<T>,
    ) -> ValidationOutcome {
        let mut is_valid = true;
        let mut errors = ErrorMap::new();

        for validator in validators {
            if validator.check(Arc::clone(&value)).await {
                continue;
            }

            is_valid = false;
            errors.insert_if_absent(validator.name(), validator.failure().clone());

            if self.interrupt || validator.is_interrupt() {
                trace!("Validation interrupted at '{}'", validator.name());
                break;
            }
        }

        ValidationOutcome {
            is_valid,
            errors: errors.into_option(),
        }
    }

    /// Evaluate one field's validators, stopping at the first failure.
    pub async fn first_failure<T: Send + Sync + 'static>(
        validators: &[Arc<BoundValidator<T>>],
        value: Arc<T>,
    ) -> Option<ErrorValue> {
        for validator in validators {
            if !validator.check(Arc::clone(&value)).await {
                return Some(validator.failure().clone());
            }
        }
        None
    }
}
