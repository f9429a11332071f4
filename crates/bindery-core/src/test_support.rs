//! Shared fixtures for the in-crate test suites.

use crate::{
    binding::Binding,
    registry::Registry,
    schema::{ColumnDefault, SchemaBuilder, SchemaDescriptor},
    value::{Value, ValueSet},
};
use std::sync::Arc;

fn empty_type_set() -> Value {
    Value::Set(ValueSet::new(Vec::new()))
}

/// The logging-consumer shape: three columns per setting.
pub(crate) fn bypass_schema() -> Arc<SchemaDescriptor> {
    SchemaBuilder::new("bypass")
        .column("types", ColumnDefault::Factory(empty_type_set))
        .column("module", Value::Null)
        .column("attr", Value::Null)
        .standard_views()
        .build()
        .expect("bypass schema is valid")
}

/// Two-column schema with an extra single-column view.
pub(crate) fn pair_schema() -> Arc<SchemaDescriptor> {
    SchemaBuilder::new("pair")
        .column("module", Value::Null)
        .column("attr", Value::Null)
        .view("modules", &[1])
        .standard_views()
        .build()
        .expect("pair schema is valid")
}

pub(crate) fn pair(module: &str, attr: &str) -> Binding {
    Binding::new(vec![Value::text(module), Value::text(attr)])
}

/// Keys `a`, `b`, `c`, each bound to one `(mod-*, attr-*)` tuple.
pub(crate) fn abc_registry() -> Registry {
    let mut registry = Registry::new(pair_schema());
    for name in ["a", "b", "c"] {
        registry
            .insert_binding(name, pair(&format!("mod-{name}"), &format!("attr-{name}")))
            .expect("arity matches");
    }
    registry
}
