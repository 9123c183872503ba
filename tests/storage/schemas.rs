//! Integration tests for fact schemas
//!
//! Tests defaults, required fields, type checks, named types, and validators.

use std::cell::Cell;
use std::rc::Rc;

use ember_foundation::{ErrorKind, Type, Value, record};
use ember_storage::{FactSchema, FieldSchema, SchemaRegistry};

fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register(
        FactSchema::new("Customer")
            .with_field(FieldSchema::required("name", Type::String))
            .with_field(FieldSchema::optional("tier", Type::String).with_default("basic")),
    );
    registry.register(
        FactSchema::new("Order")
            .with_field(
                FieldSchema::required("total", Type::Number).with_validator(|v| {
                    v.as_number().is_some_and(|n| n >= 0.0)
                }),
            )
            .with_field(FieldSchema::optional("customer", Type::parse("Customer"))),
    );
    registry
}

#[test]
fn schemaless_kinds_pass_through() {
    let r = record([("kind", Value::from("Note")), ("x", Value::from(1))]);
    assert_eq!(registry().validate(r.clone()).unwrap(), r);
}

#[test]
fn defaults_fill_absent_fields() {
    let validated = registry()
        .validate(record([("kind", "Customer"), ("name", "ann")]))
        .unwrap();
    assert_eq!(validated.get("tier"), Some(&Value::from("basic")));
}

#[test]
fn present_fields_are_not_defaulted() {
    let validated = registry()
        .validate(record([("kind", "Customer"), ("name", "ann"), ("tier", "gold")]))
        .unwrap();
    assert_eq!(validated.get("tier"), Some(&Value::from("gold")));
}

#[test]
fn missing_required_field_fails() {
    let err = registry()
        .validate(record([("kind", Value::from("Customer")), ("name", Value::Null)]))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Validation { ref field, .. } if field == "name"));
    assert_eq!(err.kind_name(), "ValidationError");
}

#[test]
fn wrong_type_fails() {
    let err = registry()
        .validate(record([("kind", Value::from("Order")), ("total", Value::from("10"))]))
        .unwrap_err();
    assert!(err.to_string().contains("expected number, got string"));
}

#[test]
fn validator_runs_on_present_values() {
    let err = registry()
        .validate(record([("kind", Value::from("Order")), ("total", Value::from(-1))]))
        .unwrap_err();
    assert!(err.to_string().contains("custom validation failed"));
}

#[test]
fn named_type_checks_discriminant() {
    let registry = registry();
    let customer = Value::record([("kind", Value::from("Customer")), ("name", Value::from("ann"))]);
    let ok = record([
        ("kind", Value::from("Order")),
        ("total", Value::from(5)),
        ("customer", customer),
    ]);
    assert!(registry.validate(ok).is_ok());

    let wrong = record([
        ("kind", Value::from("Order")),
        ("total", Value::from(5)),
        ("customer", Value::record([("kind", Value::from("Order"))])),
    ]);
    assert!(registry.validate(wrong).is_err());
}

#[test]
fn unknown_named_type_fails() {
    let mut registry = SchemaRegistry::new();
    registry.register(
        FactSchema::new("Line").with_field(FieldSchema::optional("sku", Type::parse("Product"))),
    );
    let err = registry.validate(record([("kind", "Line")])).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownType(ref name) if name == "Product"));
}

#[test]
fn producer_default_runs_per_fact() {
    let calls = Rc::new(Cell::new(0_i32));
    let counter = Rc::clone(&calls);
    let mut registry = SchemaRegistry::new();
    registry.register(FactSchema::new("Ticket").with_field(
        FieldSchema::optional("seq", Type::Number).with_default_fn(move || {
            counter.set(counter.get() + 1);
            Value::from(counter.get())
        }),
    ));

    let a = registry.validate(record([("kind", "Ticket")])).unwrap();
    let b = registry.validate(record([("kind", "Ticket")])).unwrap();
    assert_eq!(a.get("seq"), Some(&Value::from(1)));
    assert_eq!(b.get("seq"), Some(&Value::from(2)));
    assert_eq!(calls.get(), 2);
}
