//! Integration tests for Value semantics
//!
//! Tests equality flavors, truthiness, ordering, display, and field access.

use std::sync::Arc;

use ember_foundation::{Fact, FactId, Type, Value, record};

// =============================================================================
// Equality
// =============================================================================

#[test]
fn same_value_equality_for_nan_and_zero() {
    assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
    assert_ne!(Value::from(0.0), Value::from(-0.0));
}

#[test]
fn strict_equality_for_nan_and_zero() {
    assert!(!Value::from(f64::NAN).strict_eq(&Value::from(f64::NAN)));
    assert!(Value::from(0.0).strict_eq(&Value::from(-0.0)));
}

#[test]
fn no_cross_type_equality() {
    assert_ne!(Value::from(1), Value::from("1"));
    assert_ne!(Value::from(1), Value::Bool(true));
    assert_ne!(Value::Null, Value::Undefined);
}

#[test]
fn collections_compare_structurally() {
    let a = Value::record([("tags", Value::list(["x", "y"])), ("n", Value::from(1))]);
    let b = Value::record([("n", Value::from(1)), ("tags", Value::list(["x", "y"]))]);
    assert_eq!(a, b);
    assert_ne!(Value::list([1, 2]), Value::list([2, 1]));
}

#[test]
fn facts_compare_by_identity() {
    let fields = record([("total", 5)]);
    let a = Arc::new(Fact::new(FactId(1), Arc::from("Order"), fields.clone()));
    let b = Arc::new(Fact::new(FactId(2), Arc::from("Order"), fields));
    assert_ne!(Value::from(a.clone()), Value::from(b));
    assert_eq!(Value::from(a.clone()), Value::from(a));
}

// =============================================================================
// Truthiness
// =============================================================================

#[test]
fn falsy_values() {
    for v in [
        Value::Undefined,
        Value::Null,
        Value::Bool(false),
        Value::from(0),
        Value::from(-0.0),
        Value::from(f64::NAN),
        Value::from(""),
    ] {
        assert!(!v.is_truthy(), "{v:?} should be falsy");
    }
}

#[test]
fn truthy_values() {
    for v in [
        Value::Bool(true),
        Value::from(-1),
        Value::from("0"),
        Value::list(Vec::<i32>::new()),
        Value::record(Vec::<(&str, Value)>::new()),
    ] {
        assert!(v.is_truthy(), "{v:?} should be truthy");
    }
}

// =============================================================================
// Ordering and Display
// =============================================================================

#[test]
fn ordering_within_type_only() {
    assert!(Value::from(1) < Value::from(2));
    assert!(Value::from("a") < Value::from("b"));
    assert!(Value::from(1).partial_cmp(&Value::from("1")).is_none());
}

#[test]
fn numbers_display_without_fraction() {
    assert_eq!(Value::from(150).to_string(), "150");
    assert_eq!(Value::from(1.5).to_string(), "1.5");
    assert_eq!(format!("{:?}", Value::from(f64::INFINITY)), "Infinity");
}

#[test]
fn type_names() {
    assert_eq!(Value::Undefined.type_name(), "undefined");
    assert_eq!(Value::list([1]).type_name(), "array");
    assert_eq!(Value::record([("a", Value::Null)]).type_name(), "object");
}

// =============================================================================
// Field Access
// =============================================================================

#[test]
fn fact_fields_include_kind() {
    let fact = Arc::new(Fact::new(
        FactId(7),
        Arc::from("Customer"),
        record([("name", "ann")]),
    ));
    let value = Value::from(fact);

    assert_eq!(value.field("kind"), Some(&Value::from("Customer")));
    assert_eq!(value.field("name"), Some(&Value::from("ann")));
    assert_eq!(value.field("missing"), None);
}

#[test]
fn size_of_composites() {
    assert_eq!(Value::from("héllo").size(), Some(5));
    assert_eq!(Value::list([1, 2, 3]).size(), Some(3));
    assert_eq!(Value::from(3).size(), None);
}

#[test]
fn primitive_types_accept_shapes() {
    assert_eq!(Type::parse("number").accepts(&Value::from(1)), Some(true));
    assert_eq!(Type::parse("string").accepts(&Value::from(1)), Some(false));
    assert_eq!(Type::parse("object").accepts(&Value::record([("a", Value::Null)])), Some(true));
    assert_eq!(Type::parse("Customer").accepts(&Value::Null), None);
}
