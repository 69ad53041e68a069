//! Value kinds and the sets codecs declare support for.

use std::fmt;

/// The kind of a [`crate::Value`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Bool,
    Number,
    /// NaN and the infinities.
    NonFiniteNumber,
    BigInt,
    String,
    Array,
    Object,
    Map,
    Set,
    Date,
    RegExp,
    /// A node reached more than once (shared or cyclic reference).
    Reference,
    Function,
    Custom,
}

impl ValueKind {
    /// All kinds, in declaration order.
    pub const ALL: [ValueKind; 16] = [
        Self::Undefined,
        Self::Null,
        Self::Bool,
        Self::Number,
        Self::NonFiniteNumber,
        Self::BigInt,
        Self::String,
        Self::Array,
        Self::Object,
        Self::Map,
        Self::Set,
        Self::Date,
        Self::RegExp,
        Self::Reference,
        Self::Function,
        Self::Custom,
    ];

    /// Get the name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::NonFiniteNumber => "non-finite number",
            Self::BigInt => "bigint",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Map => "map",
            Self::Set => "set",
            Self::Date => "date",
            Self::RegExp => "regexp",
            Self::Reference => "shared reference",
            Self::Function => "function",
            Self::Custom => "custom object",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A set of value kinds.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct KindSet(u32);

impl KindSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Kinds representable by plain JSON.
    pub fn json() -> Self {
        Self::empty()
            .with(ValueKind::Null)
            .with(ValueKind::Bool)
            .with(ValueKind::Number)
            .with(ValueKind::String)
            .with(ValueKind::Array)
            .with(ValueKind::Object)
    }

    /// Every kind that carries data (everything except functions and custom objects).
    pub fn structured() -> Self {
        ValueKind::ALL
            .into_iter()
            .filter(|k| !matches!(k, ValueKind::Function | ValueKind::Custom))
            .collect()
    }

    /// Add a kind.
    pub fn with(mut self, kind: ValueKind) -> Self {
        self.0 |= kind.bit();
        self
    }

    /// Remove a kind.
    pub fn without(mut self, kind: ValueKind) -> Self {
        self.0 &= !kind.bit();
        self
    }

    /// Check whether a kind is in the set.
    pub fn contains(&self, kind: ValueKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Iterate over the kinds in the set.
    pub fn iter(&self) -> impl Iterator<Item = ValueKind> + '_ {
        ValueKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

impl FromIterator<ValueKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = ValueKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_kinds() {
        let kinds = KindSet::json();
        assert!(kinds.contains(ValueKind::Object));
        assert!(kinds.contains(ValueKind::String));
        assert!(!kinds.contains(ValueKind::Map));
        assert!(!kinds.contains(ValueKind::Reference));
        assert_eq!(kinds.iter().count(), 6);
    }

    #[test]
    fn test_structured_excludes_code() {
        let kinds = KindSet::structured();
        assert!(kinds.contains(ValueKind::Date));
        assert!(kinds.contains(ValueKind::Reference));
        assert!(!kinds.contains(ValueKind::Function));
        assert!(!kinds.contains(ValueKind::Custom));
    }

    #[test]
    fn test_with_without() {
        let kinds = KindSet::empty().with(ValueKind::Set).with(ValueKind::Map);
        assert!(kinds.contains(ValueKind::Set));
        let kinds = kinds.without(ValueKind::Set);
        assert!(!kinds.contains(ValueKind::Set));
        assert!(kinds.contains(ValueKind::Map));
    }
}
