use crate::value::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

///
/// Binding
///
/// One immutable fixed-arity value-tuple associated with a key.
/// The tuple is shared: `Clone` aliases the same storage, which is the
/// shallow copy of the container contract. Arity is enforced at the
/// container boundary, not here.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Binding(Arc<[Value]>);

impl Binding {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values.into())
    }

    /// Number of value columns in the tuple.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Column value by zero-based value-column index.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Duplicate the tuple storage instead of aliasing it.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self(self.0.to_vec().into())
    }

    /// True when two bindings alias the same tuple storage.
    #[must_use]
    pub fn aliases(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<Value>> for Binding {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl<'a> IntoIterator for &'a Binding {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Binding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Binding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<Value>::deserialize(deserializer)?;
        Ok(Self::new(values))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> Binding {
        Binding::new(vec![Value::text(a), Value::text(b)])
    }

    #[test]
    fn clone_aliases_and_deep_clone_duplicates() {
        let original = pair("module", "attr");
        let shallow = original.clone();
        let deep = original.deep_clone();

        assert!(original.aliases(&shallow), "clone shares tuple storage");
        assert!(!original.aliases(&deep), "deep clone owns fresh storage");
        assert_eq!(deep, original, "deep clone is value-equal");
    }

    #[test]
    fn column_access_is_zero_based_over_value_columns() {
        let binding = pair("a", "b");
        assert_eq!(binding.arity(), 2);
        assert_eq!(binding.column(1), Some(&Value::text("b")));
        assert_eq!(binding.column(2), None);
    }

    #[test]
    fn serde_round_trip_preserves_tuple_order() {
        let binding = pair("x", "y");
        let json = serde_json::to_string(&binding).expect("serialize");
        let back: Binding = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, binding);
    }
}
