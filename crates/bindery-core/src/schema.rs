use crate::{
    MAX_ARITY,
    binding::Binding,
    error::{ErrorClass, ErrorOrigin, InternalError},
    value::Value,
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// SchemaError
///

#[derive(Debug, ThisError)]
pub enum SchemaError {
    #[error("schema arity {arity} outside 1..={MAX_ARITY}")]
    ArityOutOfRange { arity: usize },

    #[error("column {position} has an empty name")]
    EmptyColumnName { position: usize },

    #[error("duplicate column name '{name}'")]
    DuplicateColumn { name: &'static str },

    #[error("duplicate view name '{name}'")]
    DuplicateView { name: &'static str },

    #[error("view '{name}' selects no columns")]
    EmptyView { name: &'static str },

    #[error("view '{name}' selects column {column}, but arity is {arity}")]
    ViewColumnOutOfRange {
        name: &'static str,
        column: usize,
        arity: usize,
    },
}

impl From<SchemaError> for InternalError {
    fn from(err: SchemaError) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Schema,
            err.to_string(),
        )
    }
}

///
/// ColumnDefault
///
/// Default used by `add()` to populate an unbound binding: either a
/// ready value or a factory invoked per materialization.
///

#[derive(Clone, Debug)]
pub enum ColumnDefault {
    Value(Value),
    Factory(fn() -> Value),
}

impl ColumnDefault {
    #[must_use]
    pub fn materialize(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl From<Value> for ColumnDefault {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

///
/// ColumnSpec
///

#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub default: ColumnDefault,
}

///
/// ViewSpec
///
/// One named projection. Column index 0 is the key; 1..=arity are the
/// value columns in tuple order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ViewSpec {
    name: &'static str,
    columns: Box<[usize]>,
}

impl ViewSpec {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// The only duplicate-free projection: exactly the key column.
    #[must_use]
    pub fn is_keys_only(&self) -> bool {
        *self.columns == [0]
    }

    #[must_use]
    pub fn single_value_column(&self) -> Option<usize> {
        match *self.columns {
            [column] if column > 0 => Some(column),
            _ => None,
        }
    }
}

///
/// SchemaDescriptor
///
/// Fixed, per-concrete-mapping-type declaration of binding arity,
/// per-column defaults, and the named views to expose. Declared once;
/// all runtime instances of the type share it via `Arc`.
///

#[derive(Clone, Debug)]
pub struct SchemaDescriptor {
    name: &'static str,
    columns: Box<[ColumnSpec]>,
    views: Box<[ViewSpec]>,
}

impl SchemaDescriptor {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of value columns per binding, excluding the key.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    #[must_use]
    pub fn views(&self) -> &[ViewSpec] {
        &self.views
    }

    #[must_use]
    pub fn view(&self, name: &str) -> Option<&ViewSpec> {
        self.views.iter().find(|view| view.name == name)
    }

    /// Materialize one binding entirely from the column defaults.
    #[must_use]
    pub fn default_binding(&self) -> Binding {
        Binding::new(
            self.columns
                .iter()
                .map(|column| column.default.materialize())
                .collect(),
        )
    }
}

///
/// SchemaBuilder
///
/// Build-time validation happens here so every constructed descriptor
/// is internally consistent; the runtime container never re-checks
/// view/column declarations.
///

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    name: &'static str,
    columns: Vec<ColumnSpec>,
    views: Vec<ViewSpec>,
    standard_views: bool,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Append a value column with its default.
    #[must_use]
    pub fn column(mut self, name: &'static str, default: impl Into<ColumnDefault>) -> Self {
        self.columns.push(ColumnSpec {
            name,
            default: default.into(),
        });
        self
    }

    /// Append a named view over the given column indices (0 = key).
    #[must_use]
    pub fn view(mut self, name: &'static str, columns: &[usize]) -> Self {
        self.views.push(ViewSpec {
            name,
            columns: columns.into(),
        });
        self
    }

    /// Install `keys` → (0,), `values` → (1..=N), `items` → (0..=N).
    #[must_use]
    pub fn standard_views(mut self) -> Self {
        self.standard_views = true;
        self
    }

    pub fn build(mut self) -> Result<Arc<SchemaDescriptor>, InternalError> {
        let arity = self.columns.len();
        if arity == 0 || arity > MAX_ARITY {
            return Err(SchemaError::ArityOutOfRange { arity }.into());
        }

        for (position, column) in self.columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(SchemaError::EmptyColumnName { position }.into());
            }
            if self.columns[..position]
                .iter()
                .any(|earlier| earlier.name == column.name)
            {
                return Err(SchemaError::DuplicateColumn { name: column.name }.into());
            }
        }

        if self.standard_views {
            self.views.push(ViewSpec {
                name: "keys",
                columns: Box::new([0]),
            });
            self.views.push(ViewSpec {
                name: "values",
                columns: (1..=arity).collect(),
            });
            self.views.push(ViewSpec {
                name: "items",
                columns: (0..=arity).collect(),
            });
        }

        for (position, view) in self.views.iter().enumerate() {
            if view.columns.is_empty() {
                return Err(SchemaError::EmptyView { name: view.name }.into());
            }
            if self.views[..position]
                .iter()
                .any(|earlier| earlier.name == view.name)
            {
                return Err(SchemaError::DuplicateView { name: view.name }.into());
            }
            if let Some(&column) = view.columns.iter().find(|&&column| column > arity) {
                return Err(SchemaError::ViewColumnOutOfRange {
                    name: view.name,
                    column,
                    arity,
                }
                .into());
            }
        }

        Ok(Arc::new(SchemaDescriptor {
            name: self.name,
            columns: self.columns.into_boxed_slice(),
            views: self.views.into_boxed_slice(),
        }))
    }
}

///
/// TESTS
///
