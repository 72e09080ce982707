//! Built-in validation rules.
//!
//! Each rule is an ordinary [`Validator`]; combine them on a field in the
//! order they should be checked, since the first failure wins.

use regex::Regex;

use super::validator::Validator;
use crate::error::Result;

/// Require a non-blank string.
pub fn required<T: Send + Sync + 'static>(msg: impl Into<String>) -> Validator<String, T> {
    Validator::new(msg, |v: &String, _: &T| !v.trim().is_empty())
}

/// Require minimum length (in characters).
pub fn min_length<T: Send + Sync + 'static>(
    min: usize,
    msg: impl Into<String>,
) -> Validator<String, T> {
    Validator::new(msg, move |v: &String, _: &T| v.chars().count() >= min)
}

/// Require maximum length (in characters).
pub fn max_length<T: Send + Sync + 'static>(
    max: usize,
    msg: impl Into<String>,
) -> Validator<String, T> {
    Validator::new(msg, move |v: &String, _: &T| v.chars().count() <= max)
}

/// Require the value to match a regex pattern.
pub fn pattern<T: Send + Sync + 'static>(
    pattern: &str,
    msg: impl Into<String>,
) -> Result<Validator<String, T>> {
    let re = Regex::new(pattern)?;
    Ok(Validator::new(msg, move |v: &String, _: &T| re.is_match(v)))
}

/// Require a valid email address. Empty input passes; pair with [`required`].
pub fn email<T: Send + Sync + 'static>(msg: impl Into<String>) -> Validator<String, T> {
    Validator::new(msg, |v: &String, _: &T| {
        v.is_empty() || email_address::EmailAddress::is_valid(v)
    })
}

/// Require a checkbox to be checked.
pub fn checked<T: Send + Sync + 'static>(msg: impl Into<String>) -> Validator<bool, T> {
    Validator::new(msg, |v: &bool, _: &T| *v)
}

/// Require an optional value to be present.
pub fn selected<V, T>(msg: impl Into<String>) -> Validator<Option<V>, T>
where
    V: Send + 'static,
    T: Send + Sync + 'static,
{
    Validator::new(msg, |v: &Option<V>, _: &T| v.is_some())
}

/// Require a collection to have at least one element.
pub fn non_empty<I, T>(msg: impl Into<String>) -> Validator<Vec<I>, T>
where
    I: Send + 'static,
    T: Send + Sync + 'static,
{
    Validator::new(msg, |v: &Vec<I>, _: &T| !v.is_empty())
}

/// Require `value >= min`.
pub fn min<N, T>(min: N, msg: impl Into<String>) -> Validator<N, T>
where
    N: PartialOrd + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    Validator::new(msg, move |v: &N, _: &T| *v >= min)
}

/// Require `value <= max`.
pub fn max<N, T>(max: N, msg: impl Into<String>) -> Validator<N, T>
where
    N: PartialOrd + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    Validator::new(msg, move |v: &N, _: &T| *v <= max)
}
