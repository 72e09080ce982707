//! Lift channel between nested scopes.
//!
//! A scope with a parent hands every [`LiftMessage`] to its parent's
//! [`LiftHandler`], merging non-deferred fragments into its own map on the
//! way. A scope without one is terminal: it buffers deferred
//! `Validate` fragments in a [`LiftAccumulator`] and merges them into its
//! own error map when the non-deferred fragment of the same run arrives.
//!
//! Fragment entries are `Option<ErrorValue>`; `None` unsets the key.
//!
//! # Merge rules
//!
//! 1. Fragments combine in arrival order; later entries overwrite earlier.
//! 2. [`ErrorValue::ContainsInvalidChild`] never overwrites a real message.
//! 3. An unset entry removes the key.
//! 4. A merged map with no entries is `None`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::validation::{ErrorMap, ErrorValue};

/// Partial error map carried by a lift.
pub type Fragment = BTreeMap<String, Option<ErrorValue>>;

/// Receives lifted fragments from a child scope.
pub type LiftHandler = Arc<dyn Fn(LiftMessage) + Send + Sync>;

/// A fragment travelling from a scope toward its terminal ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiftMessage {
    /// Produced by a whole-scope `validate` run.
    Validate {
        fragment: Fragment,
        /// Buffer until the run's terminal fragment arrives.
        defer_commit: bool,
    },
    /// Produced by a single-field validation or a field detaching.
    ValidateField { fragment: Fragment },
}

impl LiftMessage {
    pub fn fragment(&self) -> &Fragment {
        match self {
            Self::Validate { fragment, .. } | Self::ValidateField { fragment } => fragment,
        }
    }

    /// Same message kind with a different fragment.
    pub fn with_fragment(&self, fragment: Fragment) -> Self {
        match self {
            Self::Validate { defer_commit, .. } => Self::Validate {
                fragment,
                defer_commit: *defer_commit,
            },
            Self::ValidateField { .. } => Self::ValidateField { fragment },
        }
    }
}

/// Ordered buffer of deferred fragments owned by a terminal scope.
#[derive(Debug, Default)]
pub struct LiftAccumulator {
    pending: Vec<Fragment>,
}

impl LiftAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.pending.push(fragment);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Combine every buffered fragment with `last` and empty the buffer.
    pub fn drain_with(&mut self, last: Fragment) -> Fragment {
        let mut combined = Fragment::new();
        for fragment in self.pending.drain(..).chain(std::iter::once(last)) {
            overlay(&mut combined, fragment);
        }
        combined
    }
}

/// Lift form of a committed map: every entry set.
pub fn fragment_of(errors: Option<&ErrorMap>) -> Fragment {
    errors
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), Some(v.clone())))
                .collect()
        })
        .unwrap_or_default()
}

/// Entries of `next`, plus an unset for every key of `prev` that `next` lacks.
pub fn diff(prev: Option<&ErrorMap>, next: Option<&ErrorMap>) -> Fragment {
    let mut fragment = fragment_of(next);
    if let Some(prev) = prev {
        for key in prev.keys() {
            fragment.entry(key.clone()).or_insert(None);
        }
    }
    fragment
}

/// Drop unset entries and normalize to `None` when empty.
pub fn materialize(fragment: Fragment) -> Option<ErrorMap> {
    fragment
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect::<ErrorMap>()
        .into_option()
}

/// Merge `fragment` into `current`, returning the resulting map.
pub fn apply(current: Option<&ErrorMap>, fragment: Fragment) -> Option<ErrorMap> {
    let mut merged = fragment_of(current);
    overlay(&mut merged, fragment);
    materialize(merged)
}

fn overlay(base: &mut Fragment, fragment: Fragment) {
    for (key, incoming) in fragment {
        let keeps_message = matches!(
            (base.get(&key), &incoming),
            (Some(Some(ErrorValue::Message(_))), Some(ErrorValue::ContainsInvalidChild))
        );
        if !keeps_message {
            base.insert(key, incoming);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(s: &str) -> Option<ErrorValue> {
        Some(ErrorValue::from(s))
    }

    fn frag(entries: &[(&str, Option<ErrorValue>)]) -> Fragment {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_later_fragments_overwrite_earlier() {
        let mut acc = LiftAccumulator::new();
        acc.push(frag(&[("name", msg("first"))]));
        let combined = acc.drain_with(frag(&[("name", msg("second"))]));
        assert_eq!(combined, frag(&[("name", msg("second"))]));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_sentinel_does_not_overwrite_message() {
        let mut acc = LiftAccumulator::new();
        acc.push(frag(&[("items", msg("You should add item"))]));
        let combined = acc.drain_with(frag(&[("items", Some(ErrorValue::ContainsInvalidChild))]));
        assert_eq!(combined, frag(&[("items", msg("You should add item"))]));
    }

    #[test]
    fn test_message_overwrites_sentinel() {
        let current = ErrorMap::from([("items", ErrorValue::ContainsInvalidChild)]);
        let merged = apply(Some(&current), frag(&[("items", msg("real"))]));
        assert_eq!(merged, Some(ErrorMap::from([("items", ErrorValue::from("real"))])));
    }

    #[test]
    fn test_apply_unset_removes_key_and_normalizes() {
        let current = ErrorMap::from([("name", ErrorValue::from("required"))]);
        assert_eq!(apply(Some(&current), frag(&[("name", None)])), None);
    }

    #[test]
    fn test_apply_keeps_untouched_keys() {
        let current = ErrorMap::from([
            ("name", ErrorValue::from("required")),
            ("phone", ErrorValue::from("incorrect")),
        ]);
        let merged = apply(Some(&current), frag(&[("name", None)])).expect("phone remains");
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.message("phone"), Some("incorrect"));
    }

    #[test]
    fn test_diff_unsets_cleared_keys() {
        let prev = ErrorMap::from([("a", ErrorValue::from("x")), ("b", ErrorValue::from("y"))]);
        let next = ErrorMap::from([("b", ErrorValue::from("z"))]);
        assert_eq!(
            diff(Some(&prev), Some(&next)),
            frag(&[("a", None), ("b", msg("z"))])
        );
    }

    #[test]
    fn test_materialize_drops_unset() {
        assert_eq!(materialize(frag(&[("a", None)])), None);
    }
}
