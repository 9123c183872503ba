//! Integration tests for queries
//!
//! Tests projection, ordering, paging, parameters, and error reporting.

use std::cell::RefCell;
use std::rc::Rc;

use ember_engine::{Bindings, Condition, Engine, Expr, Order, Pattern, PatternCondition, Query};
use ember_foundation::{Record, Value, record};

fn order(customer: &str, total: Option<i32>) -> Record {
    let base = record([("kind", Value::from("Order")), ("customer", Value::from(customer))]);
    match total {
        Some(t) => base.insert("total".into(), Value::from(t)),
        None => base,
    }
}

fn engine() -> Engine {
    let mut engine = Engine::new();
    for (customer, total) in [
        ("ann", Some(30)),
        ("bob", None),
        ("cy", Some(10)),
        ("ann", Some(20)),
        ("dee", Some(40)),
    ] {
        engine.assert(order(customer, total)).unwrap();
    }
    engine
}

fn orders() -> Query {
    Query::new("orders")
        .when(
            PatternCondition::new("Order", Pattern::record([("customer", "?c")])).with_alias("o"),
        )
        .project("customer", "?c")
        .project("total", Expr::call("path", [Expr::var("o"), "total".into()]))
}

fn column(rows: &[Record], field: &str) -> Vec<Value> {
    rows.iter()
        .map(|r| r.get(field).cloned().unwrap_or(Value::Undefined))
        .collect()
}

#[test]
fn unprojected_rows_hold_user_variables() {
    let mut engine = engine();
    engine
        .add_query(
            Query::new("customers")
                .when(Condition::pattern("Order", Pattern::record([("customer", "?c")]))),
        )
        .unwrap();

    let rows = engine.query("customers").unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].get("?c"), Some(&Value::from("ann")));
    assert_eq!(rows[0].len(), 1);
}

#[test]
fn sorted_pages_put_undefined_last() {
    let mut engine = engine();
    let query = orders().order_by("total", Order::Desc);
    engine.add_query(query.clone()).unwrap();

    let all = engine.query("orders").unwrap();
    assert_eq!(
        column(&all, "total"),
        vec![
            Value::from(40),
            Value::from(30),
            Value::from(20),
            Value::from(10),
            Value::Undefined,
        ]
    );

    engine.add_query(query.offset(1).limit(2)).unwrap();
    let page = engine.query("orders").unwrap();
    assert_eq!(column(&page, "customer"), vec![Value::from("ann"), Value::from("ann")]);
}

#[test]
fn ascending_order_also_puts_undefined_last() {
    let mut engine = engine();
    engine
        .add_query(orders().order_by("total", Order::Asc))
        .unwrap();

    let rows = engine.query("orders").unwrap();
    assert_eq!(column(&rows, "customer").last(), Some(&Value::from("bob")));
    assert_eq!(column(&rows, "total")[0], Value::from(10));
}

#[test]
fn limit_zero_is_ignored() {
    let mut engine = engine();
    engine.add_query(orders().limit(0)).unwrap();
    assert_eq!(engine.query("orders").unwrap().len(), 5);
}

#[test]
fn distinct_removes_duplicate_rows() {
    let mut engine = engine();
    engine
        .add_query(
            Query::new("names")
                .when(Condition::pattern("Order", Pattern::record([("customer", "?c")])))
                .project("customer", "?c")
                .distinct(),
        )
        .unwrap();
    let rows = engine.query("names").unwrap();
    assert_eq!(
        column(&rows, "customer"),
        vec![Value::from("ann"), Value::from("bob"), Value::from("cy"), Value::from("dee")]
    );
}

#[test]
fn parameters_seed_the_join() {
    let mut engine = engine();
    engine.add_query(orders()).unwrap();
    let params = Bindings::new().with("?c", "ann");

    assert_eq!(engine.query_count("orders", &params).unwrap(), 2);
    assert!(engine.query_exists("orders", &params).unwrap());
    assert!(
        !engine
            .query_exists("orders", &Bindings::new().with("?c", "zed"))
            .unwrap()
    );
    let first = engine.query_first("orders", &params).unwrap().unwrap();
    assert_eq!(first.get("customer"), Some(&Value::from("ann")));
}

#[test]
fn path_through_missing_field_is_undefined_without_error() {
    let mut engine = engine();
    let errors = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&errors);
    engine.subscribe(move |event| {
        if event.name() == "projection-error" {
            *sink.borrow_mut() += 1;
        }
    });
    engine.add_query(orders()).unwrap();

    let rows = engine.query("orders").unwrap();
    let bob = rows.iter().find(|r| r.get("customer") == Some(&Value::from("bob"))).unwrap();
    assert!(bob.get("total").is_some_and(Value::is_undefined));
    assert_eq!(*errors.borrow(), 0);
}

#[test]
fn bare_unbound_variable_projection_is_reported() {
    let mut engine = engine();
    let errors = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&errors);
    engine.subscribe(move |event| {
        if event.name() == "projection-error" {
            *sink.borrow_mut() += 1;
        }
    });
    engine
        .add_query(
            Query::new("broken")
                .when(Condition::pattern("Order", Pattern::Wildcard))
                .project("who", "?nobody"),
        )
        .unwrap();

    let rows = engine.query("broken").unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows[0].get("who").is_some_and(Value::is_undefined));
    assert_eq!(*errors.borrow(), 5);
}

#[test]
fn unknown_query_is_a_definition_error() {
    let engine = engine();
    let err = engine.query("missing").unwrap_err();
    assert_eq!(err.kind_name(), "DefinitionError");
}

#[test]
fn queries_do_not_change_working_memory() {
    let mut engine = engine();
    engine.add_query(orders()).unwrap();
    let before = engine.fact_count();
    let pending = engine.pending_tasks();
    engine.query("orders").unwrap();
    assert_eq!(engine.fact_count(), before);
    assert_eq!(engine.pending_tasks(), pending);
}
