use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Value stored under a key of an [`ErrorMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorValue {
    /// A displayable validation message.
    Message(String),
    /// Marker written by a repeater when one of its items is invalid.
    ///
    /// Never displayed; the detail lives in the item's own scope.
    ContainsInvalidChild,
}

impl ErrorValue {
    /// Create a message value.
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Check if this is the repeater sentinel.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::ContainsInvalidChild)
    }

    /// Get the displayable message, if any.
    pub fn as_message(&self) -> Option<&str> {
        match self {
            Self::Message(msg) => Some(msg),
            Self::ContainsInvalidChild => None,
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => write!(f, "{msg}"),
            Self::ContainsInvalidChild => write!(f, "<contains invalid child>"),
        }
    }
}

impl From<&str> for ErrorValue {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_string())
    }
}

impl From<String> for ErrorValue {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

/// Field path to error value.
///
/// Scopes hold `Option<ErrorMap>` and never commit an empty map; use
/// [`ErrorMap::into_option`] to normalize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, ErrorValue>);

impl ErrorMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&ErrorValue> {
        self.0.get(name)
    }

    /// Get the displayable message for a key, skipping the sentinel.
    pub fn message(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ErrorValue::as_message)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ErrorValue) -> Option<ErrorValue> {
        self.0.insert(name.into(), value)
    }

    /// Record a failure unless the key already holds one.
    ///
    /// A real message still replaces a stored sentinel. Returns whether it
    /// was inserted.
    pub fn insert_if_absent(&mut self, name: &str, value: ErrorValue) -> bool {
        match self.0.get(name) {
            Some(ErrorValue::ContainsInvalidChild) if !value.is_sentinel() => {}
            Some(_) => return false,
            None => {}
        }
        self.0.insert(name.to_string(), value);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<ErrorValue> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ErrorValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// `None` when empty, so "no errors" has a single representation.
    pub fn into_option(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }

    /// Displayable messages only, with the sentinel stripped.
    pub fn visible(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_message().map(|msg| (k.clone(), msg.to_string())))
            .collect()
    }
}

impl FromIterator<(String, ErrorValue)> for ErrorMap {
    fn from_iter<I: IntoIterator<Item = (String, ErrorValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, ErrorValue); N]> for ErrorMap {
    fn from(entries: [(&str, ErrorValue); N]) -> Self {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

impl IntoIterator for ErrorMap {
    type Item = (String, ErrorValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ErrorValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Result of running a set of validators against a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// AND of every evaluated validator.
    pub is_valid: bool,
    /// First failure per field, `None` when nothing failed.
    pub errors: Option<ErrorMap>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        !self.is_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let mut map = ErrorMap::new();
        assert!(map.insert_if_absent("age", "required".into()));
        assert!(!map.insert_if_absent("age", "too young".into()));
        assert_eq!(map.message("age"), Some("required"));
    }

    #[test]
    fn test_insert_if_absent_message_replaces_sentinel() {
        let mut map = ErrorMap::new();
        assert!(map.insert_if_absent("items", ErrorValue::ContainsInvalidChild));
        assert!(map.insert_if_absent("items", "You should add item".into()));
        assert!(!map.insert_if_absent("items", ErrorValue::ContainsInvalidChild));
        assert_eq!(map.message("items"), Some("You should add item"));
    }

    #[test]
    fn test_empty_map_normalizes_to_none() {
        assert!(ErrorMap::new().into_option().is_none());
        let map = ErrorMap::from([("name", ErrorValue::from("required"))]);
        assert!(map.into_option().is_some());
    }

    #[test]
    fn test_visible_strips_sentinel() {
        let map = ErrorMap::from([
            ("items", ErrorValue::ContainsInvalidChild),
            ("name", ErrorValue::from("required")),
        ]);
        let visible = map.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible.get("name").map(String::as_str), Some("required"));
        assert_eq!(map.message("items"), None);
    }
}
