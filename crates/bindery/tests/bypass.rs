//! Consumer-contract walkthrough: a logging dispatcher deciding
//! whether named behaviors are overridden for the current call.

use bindery::prelude::*;

fn no_types() -> Value {
    Value::Set(ValueSet::new(Vec::new()))
}

fn bypass_schema() -> std::sync::Arc<SchemaDescriptor> {
    SchemaBuilder::new("bypass")
        .column("types", ColumnDefault::Factory(no_types))
        .column("module", Value::Null)
        .column("attr", Value::Null)
        .standard_views()
        .build()
        .expect("bypass schema is valid")
}

#[test]
fn dispatcher_reads_settings_without_raising_on_absence() {
    let mut registry = Registry::new(bypass_schema());

    registry.add("timestamp");
    registry
        .update_row(vec![
            Value::text("timestamp"),
            Value::set([Value::text("normal")]),
            Value::Null,
            Value::text("ts_override"),
        ])
        .expect("well-formed row");
    registry.add("display");

    // Active setting: ordered bindings drive the override decision.
    let bindings = registry.get(&Key::from("timestamp")).expect("configured");
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[1].column(2), Some(&Value::text("ts_override")));

    // Absent setting: indistinguishable from "not overridden".
    assert!(registry.get(&Key::from("write")).is_none());
    let fallback: [Binding; 0] = [];
    assert!(registry.get_or(&Key::from("write"), &fallback).is_empty());
}

#[test]
fn not_found_lookups_downgrade_instead_of_propagating() {
    let registry = Registry::new(bypass_schema());

    let err = registry
        .select(&IndexExpr::key("destination"))
        .expect_err("nothing configured");
    assert!(
        err.is_not_found(),
        "dispatchers downgrade this to 'not overridden'"
    );
}

#[test]
fn views_expose_the_configured_settings_in_order() {
    let mut registry = Registry::new(bypass_schema());
    for setting in ["timestamp", "display", "write"] {
        registry.add(setting);
    }

    let keys: Vec<ViewItem<'_>> = registry.keys_view().expect("standard view").iter().collect();
    assert_eq!(
        keys,
        vec![
            ViewItem::Key(&Key::from("timestamp")),
            ViewItem::Key(&Key::from("display")),
            ViewItem::Key(&Key::from("write")),
        ]
    );
}

#[test]
fn bindings_serialize_for_diagnostics() {
    let binding = Binding::new(vec![
        Value::set([Value::text("normal")]),
        Value::Null,
        Value::text("ts_override"),
    ]);

    let json = serde_json::to_string(&binding).expect("serialize");
    let back: Binding = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, binding);
}
