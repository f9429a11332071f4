use derive_more::{Deref, Display};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};
use thiserror::Error as ThisError;

///
/// Float64
///
/// Finite f64 only; -0.0 canonically stored as 0.0
/// so Eq/Hash/Ord stay consistent.
///

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Display, Serialize)]
pub struct Float64(f64);

impl Float64 {
    /// Fallible constructor that rejects non-finite values and normalizes -0.0.
    #[must_use]
    pub fn try_new(v: f64) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }

        Some(Self(if v == 0.0 { 0.0 } else { v }))
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Float64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Float64 {}

impl Hash for Float64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Float64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Float64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Float64 {
    type Error = Float64Error;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::try_new(v).ok_or(Float64Error::NonFinite)
    }
}

impl<'de> Deserialize<'de> for Float64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Self::try_new(raw).ok_or_else(|| serde::de::Error::custom("non-finite float64 payload"))
    }
}

#[derive(Debug, ThisError)]
pub enum Float64Error {
    #[error("non-finite float64 payload")]
    NonFinite,
}

///
/// ValueSet
///
/// Canonical deterministic set representation.
///
/// - Sets are unordered values; insertion order is discarded.
/// - Elements are always sorted by canonical value order and are unique.
/// - Sets are legal binding values but never keys and never row containers.
///

#[derive(Clone, Debug, Deref, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ValueSet(Box<[Value]>);

impl ValueSet {
    /// Canonicalize: sort by value order, drop duplicates.
    #[must_use]
    pub fn new(mut elements: Vec<Value>) -> Self {
        elements.sort();
        elements.dedup();

        Self(elements.into_boxed_slice())
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.0.binary_search(value).is_ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ValueSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let elements = Vec::<Value>::deserialize(deserializer)?;
        Ok(Self::new(elements))
    }
}

///
/// Value
///
/// Column payloads for bindings. A closed dynamic enum rather than a
/// generic parameter so heterogeneous tuples, defaults, and row inputs
/// share one representation.
///
/// Null → the column is explicitly empty (distinct from an absent key).
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(Float64),
    Text(String),
    Bytes(Vec<u8>),
    /// Ordered list of values; list order is preserved.
    List(Vec<Self>),
    /// Canonical deterministic set; see [`ValueSet`].
    Set(ValueSet),
}

impl Value {
    // Variant ranks for cross-variant ordering (do not reorder).
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Uint(_) => 3,
            Self::Float(_) => 4,
            Self::Text(_) => 5,
            Self::Bytes(_) => 6,
            Self::List(_) => 7,
            Self::Set(_) => 8,
        }
    }

    /// Scalar kind label for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Set(_) => "set",
        }
    }

    /// Build a canonical set value.
    pub fn set(elements: impl IntoIterator<Item = Self>) -> Self {
        Self::Set(elements.into_iter().collect())
    }

    /// Build a text value.
    pub fn text(v: impl Into<String>) -> Self {
        Self::Text(v.into())
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Set(a), Self::Set(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

///
/// TESTS
///
