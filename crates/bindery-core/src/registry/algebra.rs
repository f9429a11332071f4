use crate::{
    binding::Binding,
    error::{ErrorClass, ErrorOrigin, InternalError},
    obs::sink::{self, MetricsEvent},
    registry::{Registry, reject},
};
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Shl, Shr, Sub};
use thiserror::Error as ThisError;

///
/// AlgebraError
///

#[derive(Debug, ThisError)]
pub enum AlgebraError {
    #[error("operand arity {right} does not match arity {left}")]
    ArityMismatch { left: usize, right: usize },
}

impl From<AlgebraError> for InternalError {
    fn from(err: AlgebraError) -> Self {
        Self::new(
            ErrorClass::ArityMismatch,
            ErrorOrigin::Algebra,
            err.to_string(),
        )
    }
}

impl Registry {
    /// Up-front capability check for the binary operator family.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.schema().arity() == other.schema().arity()
    }

    fn check_compatible(&self, other: &Self) -> Result<(), InternalError> {
        if self.is_compatible(other) {
            return Ok(());
        }

        Err(reject(AlgebraError::ArityMismatch {
            left: self.schema().arity(),
            right: other.schema().arity(),
        }))
    }

    /// In-place merge: operand keys in operand order; absent keys are
    /// inserted with all their bindings, present keys append the
    /// operand's bindings and move to the end of the order.
    pub fn merge_append(&mut self, other: &Self) -> Result<(), InternalError> {
        self.check_compatible(other)?;

        let keys = other.len() as u64;
        for (key, bindings) in other.iter() {
            if self.contains_key(key) {
                self.entries_mut()
                    .get_mut(key)
                    .expect("checked present")
                    .extend_from_slice(bindings);
                let from = self
                    .entries()
                    .get_index_of(key)
                    .expect("checked present");
                let last = self.len() - 1;
                self.entries_mut().move_index(from, last);
            } else {
                self.entries_mut().insert(key.clone(), bindings.to_vec());
            }
        }

        sink::emit(MetricsEvent::MergeApplied { keys });
        Ok(())
    }

    /// Reflected in-place merge: merged keys land at the front of the
    /// order instead, still in operand order.
    pub fn merge_prepend(&mut self, other: &Self) -> Result<(), InternalError> {
        self.check_compatible(other)?;

        let keys = other.len() as u64;
        for (key, bindings) in other.iter().collect::<Vec<_>>().into_iter().rev() {
            if self.contains_key(key) {
                self.entries_mut()
                    .get_mut(key)
                    .expect("checked present")
                    .extend_from_slice(bindings);
            } else {
                self.entries_mut().insert(key.clone(), bindings.to_vec());
            }
            let from = self
                .entries()
                .get_index_of(key)
                .expect("just inserted or present");
            self.entries_mut().move_index(from, 0);
        }

        sink::emit(MetricsEvent::MergeApplied { keys });
        Ok(())
    }

    /// Copy-then-apply wrapper over [`Self::merge_append`].
    pub fn merged(&self, other: &Self) -> Result<Self, InternalError> {
        let mut result = self.clone();
        result.merge_append(other)?;
        Ok(result)
    }

    /// Copy-then-apply wrapper over [`Self::merge_prepend`].
    pub fn merged_reflected(&self, other: &Self) -> Result<Self, InternalError> {
        let mut result = self.clone();
        result.merge_prepend(other)?;
        Ok(result)
    }

    /// In-place subtraction at `(key, binding)` granularity: for keys
    /// present in both, every self binding equal to one of the
    /// operand's bindings for that key is removed. Vacated keys stay
    /// present but unbound; see [`Self::prune_unbound`] for the
    /// opt-in alternative policy.
    pub fn subtract(&mut self, other: &Self) -> Result<(), InternalError> {
        self.check_compatible(other)?;

        let mut bindings_removed = 0u64;
        for (key, theirs) in other.iter() {
            if let Some(mine) = self.entries_mut().get_mut(key) {
                let before = mine.len();
                mine.retain(|binding| !theirs.contains(binding));
                bindings_removed += (before - mine.len()) as u64;
            }
        }

        sink::emit(MetricsEvent::SubtractApplied { bindings_removed });
        Ok(())
    }

    /// Copy-then-apply wrapper over [`Self::subtract`].
    pub fn subtracted(&self, other: &Self) -> Result<Self, InternalError> {
        let mut result = self.clone();
        result.subtract(other)?;
        Ok(result)
    }

    /// Drop every unbound key, preserving the order of the rest.
    pub fn prune_unbound(&mut self) {
        let before = self.len();
        self.entries_mut().retain(|_, bindings| !bindings.is_empty());
        for _ in self.len()..before {
            sink::emit(MetricsEvent::KeyRemoved);
        }
    }

    /// Cyclic reorder: the first key wraps to the end. Bindings travel
    /// with their key.
    pub fn rotate_left(&mut self) {
        let len = self.len();
        if len > 1 {
            self.entries_mut().move_index(0, len - 1);
        }
    }

    /// Cyclic reorder: the last key wraps to the front.
    pub fn rotate_right(&mut self) {
        let len = self.len();
        if len > 1 {
            self.entries_mut().move_index(len - 1, 0);
        }
    }

    /// Copy rotated left `n` positions.
    #[must_use]
    pub fn rotated_left(&self, n: usize) -> Self {
        let mut result = self.clone();
        if result.len() > 1 {
            for _ in 0..(n % result.len()) {
                result.rotate_left();
            }
        }
        result
    }

    /// Copy rotated right `n` positions.
    #[must_use]
    pub fn rotated_right(&self, n: usize) -> Self {
        let mut result = self.clone();
        if result.len() > 1 {
            for _ in 0..(n % result.len()) {
                result.rotate_right();
            }
        }
        result
    }

    /// Keys with fewer than `limit` bindings, order preserved.
    #[must_use]
    pub fn fewer_than(&self, limit: usize) -> Self {
        self.filter_by_count(|count| count < limit)
    }

    /// Keys with more than `limit` bindings, order preserved.
    #[must_use]
    pub fn more_than(&self, limit: usize) -> Self {
        self.filter_by_count(|count| count > limit)
    }

    /// Keys with exactly `count` bindings, order preserved.
    #[must_use]
    pub fn exactly(&self, count: usize) -> Self {
        self.filter_by_count(|found| found == count)
    }

    fn filter_by_count(&self, keep: impl Fn(usize) -> bool) -> Self {
        let mut result = Self::new(self.schema().clone());
        for (key, bindings) in self.iter() {
            if keep(bindings.len()) {
                result
                    .entries_mut()
                    .insert(key.clone(), bindings.to_vec());
            }
        }
        result
    }

    /// Pairs appearing in either operand: self's pairs first (self
    /// order, unbound keys included), then the operand's novel pairs.
    pub fn union(&self, other: &Self) -> Result<Self, InternalError> {
        self.check_compatible(other)?;

        let mut result = self.clone();
        for (key, theirs) in other.iter() {
            for binding in theirs {
                let present = result
                    .get(key)
                    .is_some_and(|mine| mine.contains(binding));
                if !present {
                    result
                        .entries_mut()
                        .entry(key.clone())
                        .or_default()
                        .push(binding.clone());
                }
            }
        }
        Ok(result)
    }

    /// Pairs appearing in both operands, in self order.
    pub fn intersection(&self, other: &Self) -> Result<Self, InternalError> {
        self.check_compatible(other)?;

        let mut result = Self::new(self.schema().clone());
        for (key, mine) in self.iter() {
            if let Some(theirs) = other.get(key) {
                let kept: Vec<Binding> = mine
                    .iter()
                    .filter(|binding| theirs.contains(binding))
                    .cloned()
                    .collect();
                if !kept.is_empty() {
                    result.entries_mut().insert(key.clone(), kept);
                }
            }
        }
        Ok(result)
    }

    /// Pairs appearing in exactly one operand: self-only pairs in self
    /// order, then operand-only pairs in operand order.
    pub fn symmetric_difference(&self, other: &Self) -> Result<Self, InternalError> {
        self.check_compatible(other)?;

        let mut result = Self::new(self.schema().clone());
        for (key, mine) in self.iter() {
            let theirs = other.get(key).unwrap_or(&[]);
            let kept: Vec<Binding> = mine
                .iter()
                .filter(|binding| !theirs.contains(binding))
                .cloned()
                .collect();
            if !kept.is_empty() {
                result.entries_mut().insert(key.clone(), kept);
            }
        }
        for (key, theirs) in other.iter() {
            let mine = self.get(key).unwrap_or(&[]);
            for binding in theirs {
                if !mine.contains(binding) {
                    result
                        .entries_mut()
                        .entry(key.clone())
                        .or_default()
                        .push(binding.clone());
                }
            }
        }
        Ok(result)
    }
}

// Operator sugar: direct pass-throughs to the named methods, nothing
// more. The fallible binary family surfaces arity mismatches as typed
// errors instead of panicking.

impl Add for &Registry {
    type Output = Result<Registry, InternalError>;

    fn add(self, other: Self) -> Self::Output {
        self.merged(other)
    }
}

impl Sub for &Registry {
    type Output = Result<Registry, InternalError>;

    fn sub(self, other: Self) -> Self::Output {
        self.subtracted(other)
    }
}

impl BitOr for &Registry {
    type Output = Result<Registry, InternalError>;

    fn bitor(self, other: Self) -> Self::Output {
        self.union(other)
    }
}

impl BitAnd for &Registry {
    type Output = Result<Registry, InternalError>;

    fn bitand(self, other: Self) -> Self::Output {
        self.intersection(other)
    }
}

impl BitXor for &Registry {
    type Output = Result<Registry, InternalError>;

    fn bitxor(self, other: Self) -> Self::Output {
        self.symmetric_difference(other)
    }
}

impl Shl<usize> for &Registry {
    type Output = Registry;

    fn shl(self, n: usize) -> Registry {
        self.rotated_left(n)
    }
}

impl Shr<usize> for &Registry {
    type Output = Registry;

    fn shr(self, n: usize) -> Registry {
        self.rotated_right(n)
    }
}

impl Div<usize> for &Registry {
    type Output = Registry;

    fn div(self, limit: usize) -> Registry {
        self.fewer_than(limit)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        key::Key,
        registry::Registry,
        test_support::{abc_registry, pair, pair_schema},
    };

    #[test]
    fn merge_with_self_doubles_every_binding_list() {
        let registry = abc_registry();
        let doubled = registry.merged(&registry).expect("same schema");

        assert_eq!(doubled.len(), registry.len());
        for (key, bindings) in registry.iter() {
            let merged = doubled.get(key).expect("key survives merge");
            assert_eq!(merged.len(), bindings.len() * 2, "merge appends, never replaces");
        }
    }

    #[test]
    fn merge_moves_existing_keys_to_the_end_in_operand_order() {
        let mut left = abc_registry();
        let mut right = Registry::new(pair_schema());
        right
            .insert_binding("a", pair("mod-a2", "attr-a2"))
            .expect("arity matches");
        right
            .insert_binding("d", pair("mod-d", "attr-d"))
            .expect("arity matches");

        left.merge_append(&right).expect("same schema");
        let keys: Vec<&Key> = left.keys().collect();
        assert_eq!(
            keys,
            vec![
                &Key::from("b"),
                &Key::from("c"),
                &Key::from("a"),
                &Key::from("d"),
            ],
            "'a' moved to the end, 'd' inserted after it"
        );
        assert_eq!(
            left.get(&Key::from("a")).expect("present").len(),
            2,
            "operand bindings appended"
        );
    }

    #[test]
    fn reflected_merge_lands_operand_keys_at_the_front() {
        let mut left = abc_registry();
        let mut right = Registry::new(pair_schema());
        right
            .insert_binding("d", pair("mod-d", "attr-d"))
            .expect("arity matches");
        right
            .insert_binding("b", pair("mod-b2", "attr-b2"))
            .expect("arity matches");

        left.merge_prepend(&right).expect("same schema");
        let keys: Vec<&Key> = left.keys().collect();
        assert_eq!(
            keys,
            vec![
                &Key::from("d"),
                &Key::from("b"),
                &Key::from("a"),
                &Key::from("c"),
            ],
            "operand keys lead in operand order"
        );
    }

    #[test]
    fn arity_mismatch_is_a_typed_failure() {
        use crate::{schema::SchemaBuilder, value::Value};

        let wide = SchemaBuilder::new("wide")
            .column("one", Value::Null)
            .column("two", Value::Null)
            .column("three", Value::Null)
            .build()
            .expect("valid schema");

        let left = abc_registry();
        let right = Registry::new(wide);
        assert!(!left.is_compatible(&right));

        let err = left.merged(&right).expect_err("arity 2 vs 3");
        assert_eq!(err.class, ErrorClass::ArityMismatch);
    }

    #[test]
    fn subtract_removes_matching_pairs_but_keeps_the_vacated_key() {
        let mut left = abc_registry();
        let mut right = Registry::new(pair_schema());
        right
            .insert_binding("b", pair("mod-b", "attr-b"))
            .expect("arity matches");

        left.subtract(&right).expect("same schema");
        assert_eq!(left.len(), 3, "vacated key stays present");
        assert_eq!(
            left.get(&Key::from("b")),
            Some(&[][..]),
            "'b' is now unbound, not gone"
        );

        left.prune_unbound();
        assert_eq!(left.len(), 2, "pruning is the explicit opt-in policy");
        assert!(!left.contains_key(&Key::from("b")));
    }

    #[test]
    fn subtract_ignores_non_matching_bindings() {
        let mut left = abc_registry();
        let mut right = Registry::new(pair_schema());
        right
            .insert_binding("b", pair("other", "binding"))
            .expect("arity matches");

        left.subtract(&right).expect("same schema");
        assert_eq!(
            left.get(&Key::from("b")).expect("present").len(),
            1,
            "only equal pairs are removed"
        );
    }

    #[test]
    fn rotation_is_cyclic_and_bindings_travel() {
        let mut registry = abc_registry();
        registry.rotate_left();

        let keys: Vec<&Key> = registry.keys().collect();
        assert_eq!(keys, vec![&Key::from("b"), &Key::from("c"), &Key::from("a")]);
        assert_eq!(
            registry.get(&Key::from("a")).expect("present"),
            &[pair("mod-a", "attr-a")][..],
            "rotation never detaches bindings from their key"
        );

        registry.rotate_right();
        let keys: Vec<&Key> = registry.keys().collect();
        assert_eq!(keys, vec![&Key::from("a"), &Key::from("b"), &Key::from("c")]);
    }

    #[test]
    fn binding_count_filters_partition_by_threshold() {
        let mut registry = abc_registry();
        registry
            .insert_binding("a", pair("mod-a2", "attr-a2"))
            .expect("arity matches");

        assert_eq!(registry.fewer_than(2).len(), 2, "'b' and 'c' have one binding");
        assert_eq!(registry.more_than(1).len(), 1, "only 'a' has two");
        assert_eq!(registry.exactly(2).len(), 1);
        assert!(registry.exactly(2).contains_key(&Key::from("a")));
    }

    #[test]
    fn intersection_with_self_is_identity_and_symmetric_difference_is_empty() {
        let registry = abc_registry();

        let both = registry.intersection(&registry).expect("same schema");
        assert_eq!(both, registry, "A & A == A");

        let neither = registry
            .symmetric_difference(&registry)
            .expect("same schema");
        assert!(neither.is_empty(), "A ^ A is empty");
    }

    #[test]
    fn pair_granularity_distinguishes_same_key_different_binding() {
        let mut left = Registry::new(pair_schema());
        left.insert_binding("k", pair("m1", "a1")).expect("arity");
        let mut right = Registry::new(pair_schema());
        right.insert_binding("k", pair("m2", "a2")).expect("arity");

        let both = left.intersection(&right).expect("same schema");
        assert!(both.is_empty(), "same key, disjoint bindings share no pairs");

        let either = left.union(&right).expect("same schema");
        assert_eq!(either.len(), 1);
        assert_eq!(
            either.get(&Key::from("k")).expect("present"),
            &[pair("m1", "a1"), pair("m2", "a2")][..]
        );

        let one_side = left.symmetric_difference(&right).expect("same schema");
        assert_eq!(
            one_side.get(&Key::from("k")).expect("present").len(),
            2,
            "both pairs are exclusive to one operand"
        );
    }

    #[test]
    fn union_does_not_duplicate_shared_pairs() {
        let registry = abc_registry();
        let same = registry.union(&registry).expect("same schema");
        assert_eq!(same, registry, "A | A == A");
    }

    #[test]
    fn operator_sugar_passes_through_to_named_methods() {
        let registry = abc_registry();

        let rotated = &registry << 1usize;
        assert_eq!(rotated, registry.rotated_left(1));

        let filtered = &registry / 2usize;
        assert_eq!(filtered, registry.fewer_than(2));

        let both = (&registry & &registry).expect("same schema");
        assert_eq!(both, registry.intersection(&registry).expect("same schema"));
    }
}
