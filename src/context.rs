//! Typed key/value state shared between the pages of one session.

use std::collections::HashMap;

use crate::{Result, SearchError};

/// A value stored in a [`Context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

/// Cross-page state for one paging session.
///
/// Created empty when a session starts and dropped when it ends. The session
/// loop only reads [`Context::is_completed`]; everything else belongs to the
/// accumulator.
#[derive(Debug, Default)]
pub struct Context {
    params: HashMap<String, ContextValue>,
    completed: bool,
}

impl Context {
    /// Creates an empty, not yet completed context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the session as complete; no further page is requested.
    pub fn complete(&mut self) {
        self.completed = true;
    }

    /// Returns whether the session has been marked complete.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn get(&self, key: &str) -> Result<&ContextValue> {
        self.params
            .get(key)
            .ok_or_else(|| SearchError::MissingKey(key.to_string()))
    }

    fn mismatch(key: &str, expected: &'static str) -> SearchError {
        SearchError::TypeMismatch {
            key: key.to_string(),
            expected,
        }
    }

    /// Returns the string stored under `key`.
    pub fn get_string(&self, key: &str) -> Result<&str> {
        match self.get(key)? {
            ContextValue::String(value) => Ok(value),
            _ => Err(Self::mismatch(key, "a string")),
        }
    }

    /// Returns the integer stored under `key`.
    pub fn get_integer(&self, key: &str) -> Result<i64> {
        match self.get(key)? {
            ContextValue::Integer(value) => Ok(*value),
            _ => Err(Self::mismatch(key, "an integer")),
        }
    }

    /// Returns the boolean stored under `key`.
    pub fn get_boolean(&self, key: &str) -> Result<bool> {
        match self.get(key)? {
            ContextValue::Boolean(value) => Ok(*value),
            _ => Err(Self::mismatch(key, "a boolean")),
        }
    }

    /// Returns the string under `key`, or `default` when absent or mistyped.
    pub fn get_string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_string(key).unwrap_or(default)
    }

    /// Returns the integer under `key`, or `default` when absent or mistyped.
    pub fn get_integer_or(&self, key: &str, default: i64) -> i64 {
        self.get_integer(key).unwrap_or(default)
    }

    /// Returns the boolean under `key`, or `default` when absent or mistyped.
    pub fn get_boolean_or(&self, key: &str, default: bool) -> bool {
        self.get_boolean(key).unwrap_or(default)
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params
            .insert(key.into(), ContextValue::String(value.into()));
    }

    pub fn set_integer(&mut self, key: impl Into<String>, value: i64) {
        self.params.insert(key.into(), ContextValue::Integer(value));
    }

    pub fn set_boolean(&mut self, key: impl Into<String>, value: bool) {
        self.params.insert(key.into(), ContextValue::Boolean(value));
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.params.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_new() {
        let context = Context::new();
        assert!(!context.is_completed());
    }

    #[test]
    fn test_context_complete() {
        let mut context = Context::new();
        context.complete();
        assert!(context.is_completed());
        context.complete();
        assert!(context.is_completed());
    }

    #[test]
    fn test_context_string_roundtrip() {
        let mut context = Context::new();
        context.set_string("k", "v");
        assert_eq!(context.get_string("k").unwrap(), "v");
    }

    #[test]
    fn test_context_type_mismatch() {
        let mut context = Context::new();
        context.set_string("k", "v");
        let err = context.get_integer("k").unwrap_err();
        assert!(matches!(
            err,
            SearchError::TypeMismatch { ref key, expected: "an integer" } if key == "k"
        ));
        assert!(matches!(
            context.get_boolean("k"),
            Err(SearchError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_context_missing_key() {
        let context = Context::new();
        assert!(matches!(
            context.get_string("missing"),
            Err(SearchError::MissingKey(ref key)) if key == "missing"
        ));
    }

    #[test]
    fn test_context_defaults() {
        let mut context = Context::new();
        assert_eq!(context.get_string_or("missing", "default"), "default");
        assert_eq!(context.get_integer_or("missing", 7), 7);
        assert!(context.get_boolean_or("missing", true));

        context.set_boolean("flag", false);
        assert_eq!(context.get_integer_or("flag", 3), 3);
        assert!(!context.get_boolean_or("flag", true));
    }

    #[test]
    fn test_context_integer_and_boolean() {
        let mut context = Context::new();
        context.set_integer("page", 4);
        context.set_boolean("seen", true);
        assert_eq!(context.get_integer("page").unwrap(), 4);
        assert!(context.get_boolean("seen").unwrap());
    }

    #[test]
    fn test_context_overwrite_changes_type() {
        let mut context = Context::new();
        context.set_integer("k", 1);
        context.set_string("k", "one");
        assert_eq!(context.get_string("k").unwrap(), "one");
        assert!(context.get_integer("k").is_err());
    }

    #[test]
    fn test_context_remove() {
        let mut context = Context::new();
        context.set_integer("k", 1);
        assert_eq!(context.remove("k"), Some(ContextValue::Integer(1)));
        assert!(context.remove("k").is_none());
        assert!(matches!(
            context.get_integer("k"),
            Err(SearchError::MissingKey(_))
        ));
    }
}
