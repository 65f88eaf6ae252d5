//! Named parameter values extracted from a command invocation.
//!
//! This module provides the result types of parameter parsing and the
//! parsers that produce them:
//!
//! - [`Parameters`] - the untyped name→value(s) structure a compiled
//!   usage pattern captures from an input string
//! - [`TypedParameters`] and [`Value`] - the converted form produced by
//!   the typed parser
//! - [`ParameterParser`] / [`TypedParameterParser`] - apply a compiled
//!   pattern to a concrete parameter string
//! - [`ConverterRegistry`] - maps declared parameter types to converter
//!   functions
//!
//! # Flow
//!
//! ```text
//! parameter string ──▶ ParameterParser ──▶ Parameters (strings)
//!                          │
//!                          ▼
//!                  TypedParameterParser ──▶ TypedParameters (Values)
//!                          ▲
//!                          │
//!                  ConverterRegistry (number, decimal, string, ...)
//! ```

use std::{any::Any, fmt, sync::Arc};

use indexmap::IndexMap;

mod convert;
mod parser;

pub use convert::{ConversionError, ConverterRegistry, RegistryError};
pub use parser::{ParameterError, ParameterParser, TypedParameterParser, split_type};

/// Untyped parameters: an insertion-ordered mapping from parameter name to
/// captured string value(s).
///
/// A name that occurred once maps to a single value; duplicate names
/// (`<foo> <foo>`) accumulate their values in match order. Names inside
/// unmatched optional groups are absent, never present-but-empty.
///
/// # Examples
///
/// ```
/// use magpie::usage::PatternCompiler;
///
/// let pattern = PatternCompiler::new().compile("<foo> <foo>").unwrap();
/// let params = pattern.match_text("a b").unwrap();
///
/// assert_eq!(params.get("foo"), Some("a"));
/// assert_eq!(params.get_all("foo"), ["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: IndexMap<String, Vec<String>>,
}

impl Parameters {
    pub fn new() -> Self {
        Parameters {
            values: IndexMap::new(),
        }
    }

    /// The first value captured under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values captured under `name`, in match order. Empty for absent
    /// names.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any value was captured under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of distinct names present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The names present, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterates name→values pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Appends a value under `name`, keeping earlier values of the same
    /// name in place.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    /// Post-match reassignment between two specific names.
    ///
    /// When a usage contains both a placeholder and a literal reading of
    /// the same token - `(<user> | 'all')` - the first declared branch
    /// wins at match time, which may file the literal text under the
    /// placeholder name. This method is the explicit escape hatch: every
    /// value captured under `placeholder` that equals the literal text
    /// `literal` is moved under `literal` instead. Disambiguation is
    /// never automatic; calling this is a policy decision of the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use magpie::usage::PatternCompiler;
    ///
    /// let pattern = PatternCompiler::new().compile("(<user> | 'all')").unwrap();
    /// let mut params = pattern.match_text("all").unwrap();
    /// assert_eq!(params.get("user"), Some("all"));
    ///
    /// params.fixup("user", "all");
    /// assert!(!params.contains("user"));
    /// assert_eq!(params.get("all"), Some("all"));
    /// ```
    pub fn fixup(&mut self, placeholder: &str, literal: &str) {
        let mut moved = Vec::new();
        let mut now_empty = false;

        if let Some(values) = self.values.get_mut(placeholder) {
            values.retain(|value| {
                if value == literal {
                    moved.push(value.clone());
                    false
                } else {
                    true
                }
            });
            now_empty = values.is_empty();
        }

        if now_empty {
            self.values.shift_remove(placeholder);
        }
        if !moved.is_empty() {
            self.values
                .entry(literal.to_owned())
                .or_default()
                .extend(moved);
        }
    }
}

/// A converted parameter value.
///
/// The built-in converters produce [`Integer`], [`Decimal`] and [`Text`];
/// user-supplied converters may return any of those or wrap an arbitrary
/// value in [`Other`].
///
/// [`Integer`]: Value::Integer
/// [`Decimal`]: Value::Decimal
/// [`Text`]: Value::Text
/// [`Other`]: Value::Other
#[derive(Clone)]
pub enum Value {
    /// Produced by the built-in `number` converter.
    Integer(i64),
    /// Produced by the built-in `decimal` converter.
    Decimal(f64),
    /// Produced by the built-in `string` converter.
    Text(String),
    /// An arbitrary host-defined value from a user-supplied converter.
    Other(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Value::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Downcasts an [`Other`](Value::Other) value to a concrete type.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Other(value) => value.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
            Value::Decimal(value) => f.debug_tuple("Decimal").field(value).finish(),
            Value::Text(value) => f.debug_tuple("Text").field(value).finish(),
            Value::Other(_) => f.write_str("Other(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            // Opaque values compare by identity.
            (Value::Other(a), Value::Other(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Typed parameters: the converted counterpart of [`Parameters`].
///
/// Keys are the placeholder names with any `:type` suffix removed; values
/// are the converter outputs in match order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedParameters {
    values: IndexMap<String, Vec<Value>>,
}

impl TypedParameters {
    pub fn new() -> Self {
        TypedParameters {
            values: IndexMap::new(),
        }
    }

    /// The first value converted under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(|values| values.first())
    }

    /// All values converted under `name`, in match order.
    pub fn get_all(&self, name: &str) -> &[Value] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Shorthand for an integer-typed parameter.
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_integer)
    }

    /// Shorthand for a decimal-typed parameter.
    pub fn decimal(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_decimal)
    }

    /// Shorthand for a string-typed parameter.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.values
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.entry(name.into()).or_default().push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_single_and_multiple_values() {
        let mut params = Parameters::new();
        params.push("foo", "a");
        params.push("foo", "b");
        params.push("bar", "c");

        assert_eq!(params.get("foo"), Some("a"));
        assert_eq!(params.get_all("foo"), ["a", "b"]);
        assert_eq!(params.get("bar"), Some("c"));
        assert_eq!(params.get("missing"), None);
        assert!(params.get_all("missing").is_empty());
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parameters_preserve_insertion_order() {
        let mut params = Parameters::new();
        params.push("z", "1");
        params.push("a", "2");
        params.push("m", "3");

        assert_eq!(params.names().collect::<Vec<_>>(), ["z", "a", "m"]);
    }

    #[test]
    fn test_fixup_moves_matching_value() {
        let mut params = Parameters::new();
        params.push("user", "all");

        params.fixup("user", "all");

        assert!(!params.contains("user"));
        assert_eq!(params.get("all"), Some("all"));
    }

    #[test]
    fn test_fixup_leaves_non_matching_value() {
        let mut params = Parameters::new();
        params.push("user", "alice");

        params.fixup("user", "all");

        assert_eq!(params.get("user"), Some("alice"));
        assert!(!params.contains("all"));
    }

    #[test]
    fn test_fixup_moves_only_matching_occurrences() {
        let mut params = Parameters::new();
        params.push("user", "alice");
        params.push("user", "all");

        params.fixup("user", "all");

        assert_eq!(params.get_all("user"), ["alice"]);
        assert_eq!(params.get_all("all"), ["all"]);
    }

    #[test]
    fn test_fixup_on_absent_name_is_a_no_op() {
        let mut params = Parameters::new();
        params.fixup("user", "all");
        assert!(params.is_empty());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::Decimal(1.5).as_decimal(), Some(1.5));
        assert_eq!(Value::Text("x".to_owned()).as_text(), Some("x"));
        assert_eq!(Value::Text("x".to_owned()).as_integer(), None);
    }

    #[test]
    fn test_value_other_downcast() {
        #[derive(Debug, PartialEq)]
        struct UserId(u64);

        let value = Value::Other(Arc::new(UserId(7)));
        assert_eq!(value.downcast_ref::<UserId>(), Some(&UserId(7)));
        assert!(value.downcast_ref::<String>().is_none());
        assert!(Value::Integer(1).downcast_ref::<UserId>().is_none());
    }

    #[test]
    fn test_typed_parameters_shorthands() {
        let mut params = TypedParameters::new();
        params.push("delay", Value::Integer(60));
        params.push("ratio", Value::Decimal(0.5));
        params.push("name", Value::Text("alice".to_owned()));

        assert_eq!(params.integer("delay"), Some(60));
        assert_eq!(params.decimal("ratio"), Some(0.5));
        assert_eq!(params.text("name"), Some("alice"));
        assert_eq!(params.integer("name"), None);
    }

    #[test]
    fn test_typed_parameters_multiple_values() {
        let mut params = TypedParameters::new();
        params.push("n", Value::Integer(1));
        params.push("n", Value::Integer(2));

        assert_eq!(params.get_all("n"), [Value::Integer(1), Value::Integer(2)]);
    }
}
