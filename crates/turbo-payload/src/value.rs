//! Dynamic prop values.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{KindSet, ValueKind};

/// Insertion-ordered string-keyed object.
pub type Object = IndexMap<String, Value>;

/// A dynamic value produced by a load routine.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    /// Ordered key/value pairs with arbitrary keys.
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
    Date(DateTime<Utc>),
    RegExp(RegExp),
    /// A node that may be referenced from several places, including itself.
    Shared(SharedValue),
    Function(FunctionRef),
    Custom(CustomObject),
}

/// A regular expression literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExp {
    pub source: String,
    pub flags: String,
}

/// A reference-counted value node.
///
/// Cloning shares the node. Graphs that point back into themselves keep
/// their nodes alive until a link is broken with [`SharedValue::set`].
#[derive(Clone)]
pub struct SharedValue(Arc<RwLock<Value>>);

impl SharedValue {
    /// Create a new shared node.
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> Value {
        self.0.read_recursive().clone()
    }

    /// Replace the value.
    pub fn set(&self, value: Value) {
        *self.0.write() = value;
    }

    /// Run a closure against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.0.read_recursive())
    }

    /// Check whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &SharedValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity of this node, for cycle tracking.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for SharedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedValue({:#x})", self.addr())
    }
}

/// An opaque callable carried in a prop set.
#[derive(Clone)]
pub struct FunctionRef {
    name: String,
    callable: Arc<dyn Fn(&[Value]) -> Value + Send + Sync>,
}

impl FunctionRef {
    /// Wrap a closure.
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            callable: Arc::new(f),
        }
    }

    /// Function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.callable)(args)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.name)
    }
}

/// An object of an application-defined type no codec understands.
#[derive(Clone)]
pub struct CustomObject {
    type_name: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl CustomObject {
    /// Wrap an arbitrary value.
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(value),
        }
    }

    /// Declared type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Downcast to the wrapped type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for CustomObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomObject({})", self.type_name)
    }
}

impl Value {
    /// Build an object from key/value pairs.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// An empty object.
    pub fn empty_object() -> Self {
        Self::Object(Object::new())
    }

    /// Build a map from key/value pairs.
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Map(entries.into_iter().collect())
    }

    /// Build a set. Duplicates are kept as given.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(items.into_iter().collect())
    }

    /// Build a regular expression literal.
    pub fn regexp(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self::RegExp(RegExp {
            source: source.into(),
            flags: flags.into(),
        })
    }

    /// Build a function value.
    pub fn function(
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self::Function(FunctionRef::new(name, f))
    }

    /// Wrap this value in a new shared node.
    pub fn shared(self) -> Self {
        Self::Shared(SharedValue::new(self))
    }

    /// Kind of this node. Shared nodes report the kind of their content.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Undefined => ValueKind::Undefined,
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(n) if n.is_finite() => ValueKind::Number,
            Self::Number(_) => ValueKind::NonFiniteNumber,
            Self::BigInt(_) => ValueKind::BigInt,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
            Self::Map(_) => ValueKind::Map,
            Self::Set(_) => ValueKind::Set,
            Self::Date(_) => ValueKind::Date,
            Self::RegExp(_) => ValueKind::RegExp,
            Self::Shared(_) => self.through_shared(Value::kind).unwrap_or(ValueKind::Reference),
            Self::Function(_) => ValueKind::Function,
            Self::Custom(_) => ValueKind::Custom,
        }
    }

    /// Check for `undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check whether this is an object, looking through shared nodes.
    pub fn is_object(&self) -> bool {
        self.kind() == ValueKind::Object
    }

    /// Get a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a number, looking through shared nodes.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Shared(_) => self.through_shared(Value::as_f64).flatten(),
            _ => None,
        }
    }

    /// Get a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the object fields (not through shared nodes).
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get an object field, looking through shared nodes.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Self::Object(o) => o.get(key).cloned(),
            Self::Shared(_) => self.through_shared(|v| v.get(key)).flatten(),
            _ => None,
        }
    }

    /// Check whether an object field is present.
    pub fn has_key(&self, key: &str) -> bool {
        match self {
            Self::Object(o) => o.contains_key(key),
            Self::Shared(_) => self.through_shared(|v| v.has_key(key)).unwrap_or(false),
            _ => false,
        }
    }

    /// Run `f` on the first non-shared value behind a chain of shared nodes.
    ///
    /// Returns `None` when the chain loops back on itself without reaching one.
    fn through_shared<R>(&self, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let Self::Shared(node) = self else {
            return Some(f(self));
        };
        let mut visited = HashSet::new();
        let mut current = node.clone();
        loop {
            if !visited.insert(current.addr()) {
                return None;
            }
            let next = current.with(|v| match v {
                Self::Shared(inner) => Some(inner.clone()),
                _ => None,
            });
            match next {
                Some(inner) => current = inner,
                None => return Some(current.with(f)),
            }
        }
    }

    /// Find the first node whose kind is not in `kinds`.
    ///
    /// Returns the offending kind and a path such as `$.author.tags[1]`.
    /// A shared node reached a second time requires [`ValueKind::Reference`].
    pub fn find_unsupported(&self, kinds: KindSet) -> Option<(ValueKind, String)> {
        let mut visited = HashSet::new();
        find_unsupported(self, kinds, "$".to_string(), &mut visited)
    }
}

fn find_unsupported(
    value: &Value,
    kinds: KindSet,
    path: String,
    visited: &mut HashSet<usize>,
) -> Option<(ValueKind, String)> {
    if let Value::Shared(node) = value {
        if !visited.insert(node.addr()) {
            return (!kinds.contains(ValueKind::Reference)).then_some((ValueKind::Reference, path));
        }
        return node.with(|inner| find_unsupported(inner, kinds, path, visited));
    }

    let kind = value.kind();
    if !kinds.contains(kind) {
        return Some((kind, path));
    }

    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| find_unsupported(v, kinds, format!("{path}[{i}]"), visited)),
        Value::Set(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| find_unsupported(v, kinds, format!("{path}<set:{i}>"), visited)),
        Value::Object(fields) => fields
            .iter()
            .find_map(|(k, v)| find_unsupported(v, kinds, format!("{path}.{k}"), visited)),
        Value::Map(entries) => entries.iter().enumerate().find_map(|(i, (k, v))| {
            find_unsupported(k, kinds, format!("{path}<key:{i}>"), visited)
                .or_else(|| find_unsupported(v, kinds, format!("{path}<value:{i}>"), visited))
        }),
        _ => None,
    }
}

impl PartialEq for Value {
    /// Structural equality. Shared nodes compare by content and cycles are
    /// assumed equal on revisit.
    fn eq(&self, other: &Self) -> bool {
        structural_eq(self, other, &mut HashSet::new())
    }
}

fn structural_eq(a: &Value, b: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Shared(x), Value::Shared(y)) => {
            if x.ptr_eq(y) || !seen.insert((x.addr(), y.addr())) {
                return true;
            }
            x.with(|xa| y.with(|yb| structural_eq(xa, yb, seen)))
        }
        (Value::Shared(x), other) => x.with(|xa| structural_eq(xa, other, seen)),
        (other, Value::Shared(y)) => y.with(|yb| structural_eq(other, yb, seen)),
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::RegExp(x), Value::RegExp(y)) => x == y,
        (Value::Array(x), Value::Array(y)) | (Value::Set(x), Value::Set(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| structural_eq(p, q, seen))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| structural_eq(v, w, seen)))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x.iter().zip(y).all(|((k1, v1), (k2, v2))| {
                    structural_eq(k1, k2, seen) && structural_eq(v1, v2, seen)
                })
        }
        (Value::Function(x), Value::Function(y)) => Arc::ptr_eq(&x.callable, &y.callable),
        (Value::Custom(x), Value::Custom(y)) => Arc::ptr_eq(&x.inner, &y.inner),
        _ => false,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(n.into())
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Object> for Value {
    fn from(fields: Object) -> Self {
        Self::Object(fields)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Date(date)
    }
}

impl From<SharedValue> for Value {
    fn from(node: SharedValue) -> Self {
        Self::Shared(node)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Construction Tests ===

    #[test]
    fn test_from_json() {
        let value = Value::from(json!({"a": 1, "b": [true, null], "c": "x"}));

        assert_eq!(value.get("a").and_then(|v| v.as_f64()), Some(1.0));
        assert_eq!(
            value.get("b"),
            Some(Value::Array(vec![Value::Bool(true), Value::Null]))
        );
        assert_eq!(value.get("c").as_ref().and_then(Value::as_str), Some("x"));
    }

    #[test]
    fn test_get_through_shared() {
        let value = Value::object([("k", Value::from("v"))]).shared();
        assert!(value.is_object());
        assert!(value.has_key("k"));
        assert_eq!(value.get("k"), Some(Value::from("v")));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::Undefined.kind(), ValueKind::Undefined);
        assert_eq!(Value::from(f64::NAN).kind(), ValueKind::NonFiniteNumber);
        assert_eq!(Value::set([]).kind(), ValueKind::Set);
        assert_eq!(Value::function("f", |_| Value::Null).kind(), ValueKind::Function);
        assert_eq!(Value::from(1).shared().kind(), ValueKind::Number);
    }

    #[test]
    fn test_shared_chain_without_content_terminates() {
        let a = SharedValue::new(Value::Null);
        let b = SharedValue::new(Value::Shared(a.clone()));
        a.set(Value::Shared(b.clone()));
        let value = Value::Shared(a.clone());

        assert_eq!(value.kind(), ValueKind::Reference);
        assert!(!value.is_object());
        assert_eq!(value.as_f64(), None);
        assert_eq!(value.get("k"), None);
        assert!(!value.has_key("k"));

        let nested = Value::from(2).shared().shared();
        assert_eq!(nested.kind(), ValueKind::Number);
        assert_eq!(nested.as_f64(), Some(2.0));

        a.set(Value::Null);
    }

    // === Equality Tests ===

    #[test]
    fn test_object_equality_ignores_order() {
        let a = Value::object([("x", Value::from(1)), ("y", Value::from(2))]);
        let b = Value::object([("y", Value::from(2)), ("x", Value::from(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_is_transparent() {
        let plain = Value::object([("x", Value::from(1))]);
        assert_eq!(plain.clone().shared(), plain);
    }

    #[test]
    fn test_nan_equals_nan() {
        assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
        assert_ne!(Value::from(1), Value::from("1"));
    }

    #[test]
    fn test_cyclic_equality_terminates() {
        let a = SharedValue::new(Value::Null);
        a.set(Value::object([("self", Value::Shared(a.clone()))]));
        let b = SharedValue::new(Value::Null);
        b.set(Value::object([("self", Value::Shared(b.clone()))]));

        assert_eq!(Value::Shared(a.clone()), Value::Shared(b.clone()));

        a.set(Value::Null);
        b.set(Value::Null);
    }

    #[test]
    fn test_functions_compare_by_identity() {
        let f = Value::function("f", |_| Value::Null);
        let g = Value::function("f", |_| Value::Null);
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }

    // === Kind Checking Tests ===

    #[test]
    fn test_find_unsupported_reports_path() {
        let value = Value::object([(
            "user",
            Value::object([("onClick", Value::function("onClick", |_| Value::Null))]),
        )]);

        let (kind, path) = value.find_unsupported(KindSet::structured()).unwrap();
        assert_eq!(kind, ValueKind::Function);
        assert_eq!(path, "$.user.onClick");
    }

    #[test]
    fn test_find_unsupported_shared_reference() {
        let node = SharedValue::new(Value::object([("n", Value::from(1))]));
        let value = Value::Array(vec![Value::Shared(node.clone()), Value::Shared(node)]);

        assert!(value.find_unsupported(KindSet::structured()).is_none());
        let (kind, path) = value.find_unsupported(KindSet::json()).unwrap();
        assert_eq!(kind, ValueKind::Reference);
        assert_eq!(path, "$[1]");
    }

    #[test]
    fn test_find_unsupported_custom_in_map() {
        let value = Value::map([(
            Value::from("k"),
            Value::Custom(CustomObject::new("Widget", 42u8)),
        )]);

        let (kind, path) = value.find_unsupported(KindSet::structured()).unwrap();
        assert_eq!(kind, ValueKind::Custom);
        assert_eq!(path, "$<value:0>");
    }

    #[test]
    fn test_custom_downcast() {
        let custom = CustomObject::new("Widget", 42u8);
        assert_eq!(custom.type_name(), "Widget");
        assert_eq!(custom.downcast_ref::<u8>(), Some(&42));
    }
}
