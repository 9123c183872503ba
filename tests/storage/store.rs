//! Integration tests for the fact store
//!
//! Tests identity assignment, the kind index, and metadata.

use ember_foundation::{ErrorKind, FactId, Value, record};
use ember_storage::{ActivationId, FactMeta, FactStore};

// =============================================================================
// Identity
// =============================================================================

#[test]
fn identities_increase_and_are_never_reused() {
    let mut store = FactStore::new();
    let a = store.assert(&record([("kind", "A")]), FactMeta::stated()).unwrap();
    store.retract(a.id());
    let b = store.assert(&record([("kind", "A")]), FactMeta::stated()).unwrap();

    assert_eq!(a.id(), FactId(1));
    assert_eq!(b.id(), FactId(2));
    assert!(!store.contains(a.id()));
}

#[test]
fn clear_restarts_identities() {
    let mut store = FactStore::new();
    store.assert(&record([("kind", "A")]), FactMeta::stated()).unwrap();
    store.clear();

    assert!(store.is_empty());
    let again = store.assert(&record([("kind", "A")]), FactMeta::stated()).unwrap();
    assert_eq!(again.id(), FactId(1));
}

#[test]
fn kind_is_required() {
    let mut store = FactStore::new();
    let err = store
        .assert(&record([("total", 1)]), FactMeta::stated())
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingKind));
    assert!(store.is_empty());
}

// =============================================================================
// Kind Index
// =============================================================================

#[test]
fn facts_of_kind_in_assertion_order() {
    let mut store = FactStore::new();
    for total in [3, 1, 2] {
        store
            .assert(&record([("kind", Value::from("Order")), ("total", Value::from(total))]), FactMeta::stated())
            .unwrap();
    }
    store.assert(&record([("kind", "Customer")]), FactMeta::stated()).unwrap();

    let totals: Vec<_> = store
        .facts_of_kind("Order")
        .map(|f| f.get("total").cloned().unwrap())
        .collect();
    assert_eq!(totals, vec![Value::from(3), Value::from(1), Value::from(2)]);
    assert_eq!(store.facts_of_kind("Nothing").count(), 0);
    assert_eq!(store.kinds(), vec!["Customer", "Order"]);
}

#[test]
fn retract_updates_index() {
    let mut store = FactStore::new();
    let a = store.assert(&record([("kind", "Order")]), FactMeta::stated()).unwrap();
    let removed = store.retract(a.id()).unwrap();

    assert_eq!(removed.id(), a.id());
    assert_eq!(store.facts_of_kind("Order").count(), 0);
    assert!(store.kinds().is_empty());
    assert!(store.retract(a.id()).is_none());
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn logical_metadata_names_its_activation() {
    let mut store = FactStore::new();
    let entry = store
        .assert(&record([("kind", "Alarm")]), FactMeta::logical(ActivationId(4)))
        .unwrap();

    assert!(entry.is_justified_by(ActivationId(4)));
    assert!(!entry.is_justified_by(ActivationId(5)));
    assert!(!FactMeta::stated().logical);
}

#[test]
fn stored_fact_carries_kind_field() {
    let mut store = FactStore::new();
    let entry = store
        .assert(&record([("kind", "Order"), ("status", "open")]), FactMeta::stated())
        .unwrap();
    let fact = store.fact(entry.id()).unwrap();

    assert_eq!(fact.kind(), "Order");
    assert_eq!(fact.get("kind"), Some(&Value::from("Order")));
    assert_eq!(fact.get("status"), Some(&Value::from("open")));
}
