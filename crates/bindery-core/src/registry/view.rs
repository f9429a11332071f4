use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    key::Key,
    registry::Registry,
    schema::ViewSpec,
    value::Value,
};
use std::collections::HashSet;
use thiserror::Error as ThisError;

///
/// ViewError
///

#[derive(Debug, ThisError)]
pub enum ViewError {
    #[error("view '{name}' is not declared by the schema")]
    UnknownView { name: String },

    #[error("subset comparison is only defined for the keys view, not '{name}'")]
    UnsupportedComparison { name: &'static str },
}

impl ViewError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownView { .. } => ErrorClass::NotFound,
            Self::UnsupportedComparison { .. } => ErrorClass::Unsupported,
        }
    }
}

impl From<ViewError> for InternalError {
    fn from(err: ViewError) -> Self {
        Self::new(err.class(), ErrorOrigin::View, err.to_string())
    }
}

///
/// ColumnRef
///
/// One projected column: the key or a borrowed tuple value.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnRef<'r> {
    Key(&'r Key),
    Value(&'r Value),
}

///
/// ViewItem
///
/// One emitted element: a bare key for the keys-only spec, a bare
/// value for a single-column spec, a projected row otherwise.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ViewItem<'r> {
    Key(&'r Key),
    Value(&'r Value),
    Row(Vec<ColumnRef<'r>>),
}

///
/// ViewProjection
///
/// A live, non-owning read surface: a borrow of the registry plus the
/// schema's view spec. Nothing is cached; every iteration re-walks the
/// backing container, so a freshly constructed handle always reflects
/// the current entries.
///

#[derive(Clone, Copy, Debug)]
pub struct ViewProjection<'r> {
    registry: &'r Registry,
    spec: &'r ViewSpec,
}

impl Registry {
    /// Construct the named projection declared by the schema.
    pub fn view(&self, name: &str) -> Result<ViewProjection<'_>, InternalError> {
        let spec = self.schema().view(name).ok_or_else(|| ViewError::UnknownView {
            name: name.to_string(),
        })?;

        Ok(ViewProjection {
            registry: self,
            spec,
        })
    }

    /// The standard `keys` projection.
    pub fn keys_view(&self) -> Result<ViewProjection<'_>, InternalError> {
        self.view("keys")
    }

    /// The standard `values` projection.
    pub fn values_view(&self) -> Result<ViewProjection<'_>, InternalError> {
        self.view("values")
    }

    /// The standard `items` projection.
    pub fn items_view(&self) -> Result<ViewProjection<'_>, InternalError> {
        self.view("items")
    }
}

impl<'r> ViewProjection<'r> {
    #[must_use]
    pub const fn spec(&self) -> &'r ViewSpec {
        self.spec
    }

    #[must_use]
    pub fn iter(&self) -> ViewIter<'r> {
        ViewIter {
            registry: self.registry,
            spec: self.spec,
            entry: 0,
            binding: 0,
        }
    }

    /// Element count, recomputed from the backing container: entries
    /// for the keys view, bindings otherwise.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.spec.is_keys_only() {
            self.registry.len()
        } else {
            self.registry.binding_count()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elementwise ordered comparison.
    #[must_use]
    pub fn eq_elements(&self, other: &ViewProjection<'_>) -> bool {
        let mut mine = self.iter();
        let mut theirs = other.iter();
        loop {
            match (mine.next(), theirs.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a == b => {}
                _ => return false,
            }
        }
    }

    /// Strict subset over keys. Only the keys view is duplicate-free,
    /// so the comparison is unsupported for any other spec.
    pub fn is_strict_subset(&self, other: &ViewProjection<'_>) -> Result<bool, InternalError> {
        let mine = self.key_set()?;
        let theirs = other.key_set()?;
        Ok(mine.len() < theirs.len() && mine.is_subset(&theirs))
    }

    /// Strict superset over keys; same support rule as subset.
    pub fn is_strict_superset(&self, other: &ViewProjection<'_>) -> Result<bool, InternalError> {
        other.is_strict_subset(self)
    }

    fn key_set<'a>(&'a self) -> Result<HashSet<&'a Key>, InternalError> {
        if !self.spec.is_keys_only() {
            return Err(ViewError::UnsupportedComparison {
                name: self.spec.name(),
            }
            .into());
        }

        Ok(self.registry.keys().collect())
    }
}

impl PartialEq for ViewProjection<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.eq_elements(other)
    }
}

impl Eq for ViewProjection<'_> {}

impl<'r> IntoIterator for &ViewProjection<'r> {
    type Item = ViewItem<'r>;
    type IntoIter = ViewIter<'r>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

///
/// ViewIter
///
/// Walks entries in insertion order, bindings in append order,
/// projecting the spec's columns per element. The keys-only spec
/// walks entries once each (unbound keys included); every other spec
/// emits per binding, so unbound keys contribute nothing.
///

#[derive(Debug)]
pub struct ViewIter<'r> {
    registry: &'r Registry,
    spec: &'r ViewSpec,
    entry: usize,
    binding: usize,
}

impl<'r> Iterator for ViewIter<'r> {
    type Item = ViewItem<'r>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.spec.is_keys_only() {
            let (key, _) = self.registry.entries().get_index(self.entry)?;
            self.entry += 1;
            return Some(ViewItem::Key(key));
        }

        loop {
            let (key, bindings) = self.registry.entries().get_index(self.entry)?;
            if self.binding >= bindings.len() {
                self.entry += 1;
                self.binding = 0;
                continue;
            }

            let binding = &bindings[self.binding];
            self.binding += 1;

            if let Some(column) = self.spec.single_value_column() {
                return Some(ViewItem::Value(
                    binding.column(column - 1).expect("schema-checked column"),
                ));
            }

            let row = self
                .spec
                .columns()
                .iter()
                .map(|&column| {
                    if column == 0 {
                        ColumnRef::Key(key)
                    } else {
                        ColumnRef::Value(binding.column(column - 1).expect("schema-checked column"))
                    }
                })
                .collect();
            return Some(ViewItem::Row(row));
        }
    }
}

///
/// TESTS
///
