//! Integration tests for accumulators
//!
//! Tests aggregation over stored facts and accumulate conditions in queries.

use chrono::{TimeZone, Utc};
use ember_engine::{Accumulator, Condition, Engine, Pattern, Query};
use ember_foundation::{FactRef, Value, record};

fn payments(amounts: Vec<Option<Value>>) -> (Engine, Vec<FactRef>) {
    let mut engine = Engine::new();
    for amount in amounts {
        let base = record([("kind", "Payment")]);
        let fields = match amount {
            Some(v) => base.insert("amount".into(), v),
            None => base,
        };
        engine.assert(fields).unwrap();
    }
    let facts = engine.facts_of_kind("Payment").cloned().collect();
    (engine, facts)
}

#[test]
fn sum_coerces_booleans_and_skips_the_rest() {
    let (_, facts) = payments(vec![
        Some(Value::from(10)),
        Some(Value::from(true)),
        Some(Value::from("x")),
        None,
    ]);
    assert_eq!(Accumulator::sum("amount").apply(&facts), Value::from(11));
    assert_eq!(Accumulator::count().apply(&facts), Value::from(4));
}

#[test]
fn average_of_nothing_numeric_is_zero() {
    let (_, facts) = payments(vec![Some(Value::from("x")), None]);
    assert_eq!(Accumulator::average("amount").apply(&facts), Value::from(0));
}

#[test]
fn numeric_extremes_have_infinite_identities() {
    let (_, none) = payments(vec![]);
    assert_eq!(Accumulator::min_number("amount").apply(&none), Value::from(f64::INFINITY));
    assert_eq!(Accumulator::max_number("amount").apply(&none), Value::from(f64::NEG_INFINITY));

    let (_, some) = payments(vec![Some(Value::from(4)), Some(Value::from(-2))]);
    assert_eq!(Accumulator::min_number("amount").apply(&some), Value::from(-2));
    assert_eq!(Accumulator::max_number("amount").apply(&some), Value::from(4));
}

#[test]
fn typed_extremes_ignore_other_types() {
    let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let (_, facts) = payments(vec![
        Some(Value::from(late)),
        Some(Value::from("b")),
        Some(Value::from(early)),
        Some(Value::from("a")),
        Some(Value::from(false)),
    ]);

    assert_eq!(Accumulator::min_date("amount").apply(&facts), Value::from(early));
    assert_eq!(Accumulator::max_date("amount").apply(&facts), Value::from(late));
    assert_eq!(Accumulator::min_string("amount").apply(&facts), Value::from("a"));
    assert_eq!(Accumulator::max_string("amount").apply(&facts), Value::from("b"));
    assert_eq!(Accumulator::max_boolean("amount").apply(&facts), Value::from(false));
}

#[test]
fn empty_typed_extremes() {
    let (_, none) = payments(vec![]);
    assert_eq!(Accumulator::min_date("amount").apply(&none), Value::Null);
    assert_eq!(Accumulator::max_boolean("amount").apply(&none), Value::Null);
    assert!(Accumulator::min_string("amount").apply(&none).is_undefined());
}

#[test]
fn collect_keeps_order_and_distinct_drops_repeats() {
    let (_, facts) = payments(vec![
        Some(Value::from(1)),
        Some(Value::from(2)),
        Some(Value::from(1)),
    ]);
    assert_eq!(Accumulator::collect("amount").apply(&facts), Value::list([1, 2, 1]));
    assert_eq!(Accumulator::distinct_collect("amount").apply(&facts), Value::list([1, 2]));
}

#[test]
fn custom_accumulator_sees_the_facts() {
    let (_, facts) = payments(vec![Some(Value::from(3)), Some(Value::from(4))]);
    let product = Accumulator::custom("product", |facts| {
        let product: f64 = facts
            .iter()
            .filter_map(|f| f.get("amount").and_then(Value::as_number))
            .product();
        Value::from(product)
    });
    assert_eq!(product.apply(&facts), Value::from(12));
}

#[test]
fn accumulate_condition_binds_per_group() {
    let mut engine = Engine::new();
    for (customer, total) in [("ann", 10), ("bob", 5), ("ann", 15)] {
        engine
            .assert(record([
                ("kind", Value::from("Order")),
                ("customer", Value::from(customer)),
                ("total", Value::from(total)),
            ]))
            .unwrap();
    }
    for name in ["ann", "bob", "cy"] {
        engine
            .assert(record([("kind", "Customer"), ("name", name)]))
            .unwrap();
    }
    engine
        .add_query(
            Query::new("spend")
                .when(Condition::pattern("Customer", Pattern::record([("name", "?c")])))
                .when(Condition::accumulate(
                    "Order",
                    Pattern::record([("customer", "?c")]),
                    Accumulator::sum("total"),
                    "spent",
                ))
                .project("customer", "?c")
                .project("spent", "?spent"),
        )
        .unwrap();

    let rows = engine.query("spend").unwrap();
    let spent: Vec<_> = rows.iter().map(|r| r.get("spent").cloned().unwrap()).collect();
    assert_eq!(spent, vec![Value::from(25), Value::from(5), Value::from(0)]);
}
