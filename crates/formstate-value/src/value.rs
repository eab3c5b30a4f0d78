//! The form value tree.
//!
//! Mappings and arrays live behind [`Node`] handles. Cloning a [`Value`] is
//! shallow: the clone points at the same nodes, which is how a subtree can be
//! reachable from two parents. Use [`deep_clone`](crate::deep_clone) for an
//! independent copy.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use regex::Regex;

/// Key/value contents of a mapping node.
pub type Map = BTreeMap<String, Value>;

/// A shared tree node.
///
/// Two `Node`s are the same node when [`Node::ptr_eq`] says so; equality of
/// contents is a separate question answered by [`deep_equal`](crate::deep_equal).
pub struct Node<T>(Arc<RwLock<T>>);

impl<T> Node<T> {
    /// Wrap contents in a fresh node.
    pub fn new(inner: T) -> Self {
        Self(Arc::new(RwLock::new(inner)))
    }

    /// Borrow the node contents.
    ///
    /// A poisoned lock is recovered: the contents are plain data and stay
    /// usable after a panicking writer.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutably borrow the node contents.
    ///
    /// Only this crate writes into nodes, and only into nodes it has just
    /// copied. Outside code gets a changed tree from
    /// [`set_nested_value`](crate::set_nested_value), so a tree once handed
    /// out never changes under its reader:
    ///
    /// ```compile_fail
    /// let tree = formstate_value::Value::empty_map();
    /// tree.as_map().unwrap().write().clear();
    /// ```
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if both handles point at the same node.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Stable identity of the node while it is alive.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// A compiled regular expression carried as a value.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Borrow the compiled regex.
    pub fn as_regex(&self) -> &Regex {
        &self.0
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self(regex)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.as_str())
    }
}

/// A node of the form value tree.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Pattern(Pattern),
    List(Node<Vec<Value>>),
    Map(Node<Map>),
}

impl Value {
    /// A fresh, empty mapping.
    pub fn empty_map() -> Self {
        Value::Map(Node::new(Map::new()))
    }

    /// A fresh mapping holding `entries`.
    pub fn from_map(entries: Map) -> Self {
        Value::Map(Node::new(entries))
    }

    /// A fresh array holding `items`.
    pub fn from_list(items: Vec<Value>) -> Self {
        Value::List(Node::new(items))
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Pattern(_) => "pattern",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Node<Map>> {
        match self {
            Value::Map(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Node<Vec<Value>>> {
        match self {
            Value::List(node) => Some(node),
            _ => None,
        }
    }

    /// Shallow lookup of a key in a mapping value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_map().and_then(|node| node.read().get(key).cloned())
    }

    /// Top-level keys of a mapping value (empty for any other variant).
    pub fn keys(&self) -> Vec<String> {
        self.as_map()
            .map(|node| node.read().keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Loose truthiness: null, `false`, zero, NaN, empty strings and empty
    /// arrays are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(node) => !node.read().is_empty(),
            Value::Date(_) | Value::Pattern(_) | Value::Map(_) => true,
        }
    }

    /// Returns true if both values are the same mapping or array node.
    ///
    /// Scalars carry no identity and always compare false here.
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Map(x), Value::Map(y)) => Node::ptr_eq(x, y),
            (Value::List(x), Value::List(y)) => Node::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::deep_equal(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Date(d) => write!(f, "Date({})", d.to_rfc3339()),
            Value::Pattern(p) => write!(f, "Pattern({p:?})"),
            other => crate::json::write_json_text(other, f),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<Pattern> for Value {
    fn from(value: Pattern) -> Self {
        Value::Pattern(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::from_list(items)
    }
}

impl From<Map> for Value {
    fn from(entries: Map) -> Self {
        Value::from_map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
