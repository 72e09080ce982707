//! Repeated sub-forms.
//!
//! A [`RepeaterController`] backs one array-valued field of a parent scope
//! with one child [`ScopeNode`](crate::scope::ScopeNode) per element. Items
//! are identified by an application-supplied [`ItemKey`], so a child scope
//! follows its item through inserts, removals and swaps.

mod config;
mod controller;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scope::ScopeNode;

pub use config::RepeaterConfig;
pub use controller::RepeaterController;

/// Stable identity of a repeated item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemKey {
    Num(i64),
    Str(String),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ItemKey {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<i32> for ItemKey {
    fn from(n: i32) -> Self {
        Self::Num(i64::from(n))
    }
}

impl From<u32> for ItemKey {
    fn from(n: u32) -> Self {
        Self::Num(i64::from(n))
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// A live item: its key and the scope that owns its value.
pub struct RepeaterItem<I> {
    pub key: ItemKey,
    pub scope: ScopeNode<I>,
}

impl<I> Clone for RepeaterItem<I> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            scope: self.scope.clone(),
        }
    }
}

impl<I> fmt::Debug for RepeaterItem<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterItem")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Render context for one item.
pub struct ItemContext<T, I> {
    pub idx: usize,
    pub key: ItemKey,
    pub scope: ScopeNode<I>,
    pub is_first: bool,
    pub is_last: bool,
    pub is_even: bool,
    pub is_odd: bool,
    pub is_single: bool,
    /// Set once, on the first render after an insert that asked for focus.
    pub should_focus: bool,
    controller: RepeaterController<T, I>,
}

impl<T, I> fmt::Debug for ItemContext<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemContext")
            .field("idx", &self.idx)
            .field("key", &self.key)
            .field("should_focus", &self.should_focus)
            .finish_non_exhaustive()
    }
}

impl<T, I> ItemContext<T, I>
where
    T: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
{
    /// Remove this item from the collection.
    pub fn remove(&self) -> Result<()> {
        self.controller.remove(self.idx)
    }
}

/// Everything a repeater render pass needs.
#[derive(Debug)]
pub struct RepeaterControls<T, I> {
    pub size: usize,
    pub items: Vec<ItemContext<T, I>>,
}
