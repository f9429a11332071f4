use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// KeyShapeError
///
/// Rejections for value shapes that cannot act as a setting key.
/// Aggregates are refused because their iteration order is undefined
/// (sets) or their element semantics are ambiguous as a key (lists).
///

#[derive(Debug, ThisError)]
pub enum KeyShapeError {
    #[error("a set cannot be a key: element order is undefined")]
    UnorderedAggregate,

    #[error("a list cannot be a key: element semantics are ambiguous")]
    AmbiguousAggregate,

    #[error("null is not a key")]
    NullKey,

    #[error("scalar kind '{kind}' is not a key scalar")]
    UnsupportedScalar { kind: &'static str },
}

impl From<KeyShapeError> for InternalError {
    fn from(err: KeyShapeError) -> Self {
        Self::new(ErrorClass::KeyShape, ErrorOrigin::Container, err.to_string())
    }
}

///
/// Key
///
/// The setting identifier: a totally-ordered, hashable scalar.
/// Cross-variant order is variant rank, then payload order.
/// Variant declaration order is the rank; do not reorder.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Key {
    Int(i64),
    Uint(u64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Key {
    /// Convert a dynamic value into a key, rejecting non-key shapes.
    pub fn try_from_value(value: Value) -> Result<Self, KeyShapeError> {
        match value {
            Value::Int(v) => Ok(Self::Int(v)),
            Value::Uint(v) => Ok(Self::Uint(v)),
            Value::Text(v) => Ok(Self::Text(v)),
            Value::Bytes(v) => Ok(Self::Bytes(v)),
            Value::Set(_) => Err(KeyShapeError::UnorderedAggregate),
            Value::List(_) => Err(KeyShapeError::AmbiguousAggregate),
            Value::Null => Err(KeyShapeError::NullKey),
            Value::Bool(_) => Err(KeyShapeError::UnsupportedScalar { kind: "bool" }),
            Value::Float(_) => Err(KeyShapeError::UnsupportedScalar { kind: "float" }),
        }
    }

    /// The key as a value, for row/assoc round-trips.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(v) => Value::Int(*v),
            Self::Uint(v) => Value::Uint(*v),
            Self::Text(v) => Value::Text(v.clone()),
            Self::Bytes(v) => Value::Bytes(v.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Bytes(v) => {
                write!(f, "0x")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Key {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Key {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

///
/// TESTS
///
