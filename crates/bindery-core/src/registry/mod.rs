pub mod algebra;
pub mod index;
pub mod update;
pub mod view;

use crate::{
    binding::Binding,
    error::{ErrorClass, ErrorOrigin, InternalError},
    key::Key,
    obs::sink::{self, MetricsEvent},
    schema::SchemaDescriptor,
};
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// ContainerError
///

#[derive(Debug, ThisError)]
pub enum ContainerError {
    #[error("key not found: {key}")]
    KeyNotFound { key: Key },

    #[error("position {position} outside [-{len}, {len})")]
    PositionOutOfRange { position: isize, len: usize },

    #[error("binding arity {found} does not match schema arity {expected}")]
    ArityViolation { expected: usize, found: usize },
}

impl ContainerError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::KeyNotFound { .. } => ErrorClass::NotFound,
            Self::PositionOutOfRange { .. } => ErrorClass::OutOfRange,
            Self::ArityViolation { .. } => ErrorClass::Arity,
        }
    }
}

impl From<ContainerError> for InternalError {
    fn from(err: ContainerError) -> Self {
        Self::new(err.class(), ErrorOrigin::Container, err.to_string())
    }
}

/// Emit a validation-rejection event alongside the error itself.
pub(crate) fn reject(err: impl Into<InternalError>) -> InternalError {
    let err = err.into();
    sink::emit(MetricsEvent::ValidationRejected { class: err.class });
    err
}

///
/// Registry
///
/// The ordered multi-valued mapping: each unique key owns an ordered
/// list of fixed-arity bindings. Key iteration order is insertion
/// order and is observable; per-key binding lists preserve append
/// order. A key may exist with zero bindings ("unbound").
///
/// Single-threaded by design: no internal synchronization, no
/// blocking operations. Callers needing cross-thread use provide
/// external mutual exclusion.
///

#[derive(Clone, Debug)]
pub struct Registry {
    schema: Arc<SchemaDescriptor>,
    entries: IndexMap<Key, Vec<Binding>>,
}

impl Registry {
    #[must_use]
    pub fn new(schema: Arc<SchemaDescriptor>) -> Self {
        Self {
            schema,
            entries: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Count of entries (keys), not bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bindings across all keys.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Ordered bindings for `key`; absence is not an error.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&[Binding]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Consumer contract: absent settings read as the caller fallback,
    /// indistinguishable from "not overridden".
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &Key, fallback: &'a [Binding]) -> &'a [Binding] {
        self.get(key).unwrap_or(fallback)
    }

    /// If `key` is absent, create an entry with one binding populated
    /// from the column defaults. If present, no-op.
    pub fn add(&mut self, key: impl Into<Key>) {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return;
        }

        let binding = self.schema.default_binding();
        self.entries.insert(key, vec![binding]);
        sink::emit(MetricsEvent::KeyAdded);
        sink::emit(MetricsEvent::BindingInserted);
    }

    /// If `key` is absent, create an empty entry (explicitly present,
    /// not yet populated). If present, no-op.
    pub fn add_unbound(&mut self, key: impl Into<Key>) {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return;
        }

        self.entries.insert(key, Vec::new());
        sink::emit(MetricsEvent::KeyAdded);
    }

    /// Append `binding` to `key`'s list, creating the entry at the end
    /// of the order if absent. Fails on arity disagreement, leaving the
    /// container untouched.
    pub fn insert_binding(
        &mut self,
        key: impl Into<Key>,
        binding: Binding,
    ) -> Result<(), InternalError> {
        let expected = self.schema.arity();
        let found = binding.arity();
        if found != expected {
            return Err(reject(ContainerError::ArityViolation { expected, found }));
        }

        let key = key.into();
        let created = !self.entries.contains_key(&key);
        self.entries.entry(key).or_default().push(binding);

        if created {
            sink::emit(MetricsEvent::KeyAdded);
        }
        sink::emit(MetricsEvent::BindingInserted);
        Ok(())
    }

    /// Remove `key` and all its bindings, preserving the relative
    /// order of the remaining entries.
    pub fn remove_key(&mut self, key: &Key) -> Result<Vec<Binding>, InternalError> {
        let bindings = self
            .entries
            .shift_remove(key)
            .ok_or_else(|| ContainerError::KeyNotFound { key: key.clone() })?;

        sink::emit(MetricsEvent::KeyRemoved);
        Ok(bindings)
    }

    pub fn clear(&mut self) {
        let keys = self.entries.len() as u64;
        self.entries.clear();
        sink::emit(MetricsEvent::Cleared { keys });
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &[Binding])> {
        self.entries.iter().map(|(key, bindings)| (key, bindings.as_slice()))
    }

    /// The key at an ordinal position; negative positions count from
    /// the end.
    pub fn key_at(&self, position: isize) -> Result<&Key, InternalError> {
        let index = self.normalize_position(position)?;
        let (key, _) = self
            .entries
            .get_index(index)
            .expect("normalized position is in range");
        Ok(key)
    }

    /// Ordinal position of `key` in insertion order.
    #[must_use]
    pub fn position_of(&self, key: &Key) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    /// Duplicate binding storage instead of aliasing it. `Clone` is
    /// the shallow copy; this is the deep one.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            entries: self
                .entries
                .iter()
                .map(|(key, bindings)| {
                    (
                        key.clone(),
                        bindings.iter().map(Binding::deep_clone).collect(),
                    )
                })
                .collect(),
        }
    }

    pub(crate) fn normalize_position(&self, position: isize) -> Result<usize, InternalError> {
        let len = self.entries.len();
        let adjusted = if position < 0 {
            position + len as isize
        } else {
            position
        };

        if adjusted < 0 || adjusted as usize >= len {
            return Err(ContainerError::PositionOutOfRange { position, len }.into());
        }

        Ok(adjusted as usize)
    }

    pub(crate) fn entries(&self) -> &IndexMap<Key, Vec<Binding>> {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut IndexMap<Key, Vec<Binding>> {
        &mut self.entries
    }
}

impl PartialEq for Registry {
    /// Order-sensitive: same arity, same key order, same binding lists.
    fn eq(&self, other: &Self) -> bool {
        self.schema.arity() == other.schema.arity()
            && self.entries.len() == other.entries.len()
            && self.entries.iter().zip(other.entries.iter()).all(
                |((key_a, bindings_a), (key_b, bindings_b))| {
                    key_a == key_b && bindings_a == bindings_b
                },
            )
    }
}

impl Eq for Registry {}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_support::{bypass_schema, pair, pair_schema},
        value::Value,
    };
    use proptest::prelude::*;

    #[test]
    fn keys_iterate_in_insertion_order() {
        let mut registry = Registry::new(pair_schema());
        for name in ["c", "a", "b"] {
            registry.add(name);
        }

        let keys: Vec<&Key> = registry.keys().collect();
        assert_eq!(
            keys,
            vec![&Key::from("c"), &Key::from("a"), &Key::from("b")],
            "iteration order is call order, not sort order"
        );
    }

    #[test]
    fn reinserting_a_key_appends_a_binding_instead_of_duplicating_the_entry() {
        let mut registry = Registry::new(pair_schema());
        registry
            .insert_binding("timestamp", pair("m1", "a1"))
            .expect("arity matches");
        registry
            .insert_binding("timestamp", pair("m2", "a2"))
            .expect("arity matches");

        assert_eq!(registry.len(), 1, "one entry per unique key");
        let bindings = registry.get(&Key::from("timestamp")).expect("present");
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0], pair("m1", "a1"), "append order preserved");
        assert_eq!(bindings[1], pair("m2", "a2"));
    }

    #[test]
    fn arity_violation_leaves_the_container_unchanged() {
        let mut registry = Registry::new(pair_schema());
        registry.add("present");

        let err = registry
            .insert_binding("fresh", Binding::new(vec![Value::Null]))
            .expect_err("arity 1 against schema arity 2");
        assert_eq!(err.class, ErrorClass::Arity);
        assert_eq!(registry.len(), 1, "failing insert created no entry");
        assert!(!registry.contains_key(&Key::from("fresh")));
    }

    #[test]
    fn add_is_idempotent_and_populates_defaults() {
        let mut registry = Registry::new(bypass_schema());
        registry.add("timestamp");
        registry.add("timestamp");

        assert_eq!(registry.len(), 1);
        let bindings = registry.get(&Key::from("timestamp")).expect("present");
        assert_eq!(bindings.len(), 1, "second add is a no-op");
        assert_eq!(
            bindings[0].arity(),
            3,
            "default binding spans every schema column"
        );
    }

    #[test]
    fn add_unbound_creates_a_key_with_no_bindings() {
        let mut registry = Registry::new(pair_schema());
        registry.add_unbound("pending");

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(&Key::from("pending")),
            Some(&[][..]),
            "unbound key is present with an empty list"
        );
    }

    #[test]
    fn remove_key_preserves_relative_order_of_the_rest() {
        let mut registry = Registry::new(pair_schema());
        for name in ["a", "b", "c"] {
            registry.add(name);
        }

        registry
            .remove_key(&Key::from("b"))
            .expect("present key removes");
        let keys: Vec<&Key> = registry.keys().collect();
        assert_eq!(keys, vec![&Key::from("a"), &Key::from("c")]);

        let err = registry
            .remove_key(&Key::from("b"))
            .expect_err("absent key fails removal");
        assert!(err.is_not_found());
    }

    #[test]
    fn negative_positions_count_from_the_end() {
        let mut registry = Registry::new(pair_schema());
        for name in ["a", "b", "c"] {
            registry.add(name);
        }

        assert_eq!(registry.key_at(-1).expect("in range"), &Key::from("c"));
        assert_eq!(registry.key_at(0).expect("in range"), &Key::from("a"));

        let err = registry.key_at(3).expect_err("len is 3");
        assert_eq!(err.class, ErrorClass::OutOfRange);
        let err = registry.key_at(-4).expect_err("below -len");
        assert_eq!(err.class, ErrorClass::OutOfRange);
    }

    #[test]
    fn get_or_falls_back_without_raising() {
        let mut registry = Registry::new(pair_schema());
        registry.add("present");
        let fallback = [pair("fb", "fb")];

        assert_eq!(
            registry.get_or(&Key::from("missing"), &fallback),
            &fallback[..]
        );
        assert_ne!(registry.get_or(&Key::from("present"), &fallback), &fallback[..]);
    }

    #[test]
    fn clone_aliases_bindings_and_deep_copy_does_not() {
        let mut registry = Registry::new(pair_schema());
        registry
            .insert_binding("k", pair("m", "a"))
            .expect("arity matches");

        let shallow = registry.clone();
        let deep = registry.deep_copy();

        let original = &registry.get(&Key::from("k")).expect("present")[0];
        assert!(
            original.aliases(&shallow.get(&Key::from("k")).expect("present")[0]),
            "clone shares tuple storage"
        );
        assert!(
            !original.aliases(&deep.get(&Key::from("k")).expect("present")[0]),
            "deep copy owns fresh storage"
        );
        assert_eq!(shallow, registry);
        assert_eq!(deep, registry);
    }

    proptest! {
        #[test]
        fn order_preserved_for_any_distinct_key_sequence(
            raw in proptest::collection::hash_set(any::<i64>(), 0..32)
        ) {
            let keys: Vec<i64> = raw.into_iter().collect();
            let mut registry = Registry::new(pair_schema());
            for key in &keys {
                registry.add(*key);
            }

            let got: Vec<Key> = registry.keys().cloned().collect();
            let want: Vec<Key> = keys.iter().map(|key| Key::Int(*key)).collect();
            prop_assert_eq!(got, want);
        }

        #[test]
        fn multiplicity_counts_bindings_not_entries(copies in 1usize..8) {
            let mut registry = Registry::new(pair_schema());
            for i in 0..copies {
                registry
                    .insert_binding("same", pair("m", &i.to_string()))
                    .expect("arity matches");
            }

            prop_assert_eq!(registry.len(), 1);
            prop_assert_eq!(registry.binding_count(), copies);
        }
    }
}
