//! Integration tests for guard expressions
//!
//! Tests parsing from data, operators, path lookups, and error kinds.

use ember_engine::{Bindings, Expr, evaluate, evaluate_lenient};
use ember_foundation::{ErrorKind, Value};

fn bindings() -> Bindings {
    Bindings::new()
        .with("?total", 120)
        .with("?name", "ada")
        .with(
            "?order",
            Value::record([(
                "lines",
                Value::list([Value::record([("sku", Value::from("A-1"))])]),
            )]),
        )
}

fn parse(data: Value) -> Expr {
    Expr::parse(&data).unwrap()
}

#[test]
fn parsed_comparison_reads_bindings() {
    let guard = parse(Value::list([Value::from(">="), "?total".into(), 100.into()]));
    assert_eq!(evaluate(&guard, &bindings()).unwrap(), Value::from(true));
}

#[test]
fn nested_data_parses_as_subexpressions() {
    let guard = parse(Value::list([
        Value::from("==="),
        Value::list([Value::from("+"), "?total".into(), 1.into()]),
        121.into(),
    ]));
    assert_eq!(evaluate(&guard, &bindings()).unwrap(), Value::from(true));
}

#[test]
fn malformed_data_is_a_guard_error() {
    let err = Expr::parse(&Value::from(3)).unwrap_err();
    assert_eq!(err.kind_name(), "GuardError");

    let err = Expr::parse(&Value::list([1, 2])).unwrap_err();
    assert_eq!(err.kind_name(), "GuardError");
}

#[test]
fn division_by_zero_is_reported() {
    let div = Expr::call("/", [Expr::var("total"), Expr::lit(0)]);
    let err = evaluate(&div, &bindings()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DivisionByZero));
    assert!(err.is_guard_error());
}

#[test]
fn strict_equality_does_not_coerce() {
    let eq = Expr::call("===", [Expr::lit(1), Expr::lit("1")]);
    let ne = Expr::call("!==", [Expr::var("name"), Expr::lit("ada")]);
    assert_eq!(evaluate(&eq, &bindings()).unwrap(), Value::from(false));
    assert_eq!(evaluate(&ne, &bindings()).unwrap(), Value::from(false));
}

#[test]
fn comparison_requires_numbers() {
    let cmp = Expr::call("<", [Expr::var("name"), Expr::lit(3)]);
    assert_eq!(evaluate(&cmp, &bindings()).unwrap_err().kind_name(), "GuardError");
}

#[test]
fn path_walks_records_and_sequences() {
    let sku = Expr::call("path", [Expr::var("order"), "lines".into(), 0.into(), "sku".into()]);
    assert_eq!(evaluate(&sku, &bindings()).unwrap(), Value::from("A-1"));

    let missing = Expr::call("path", [Expr::var("order"), "lines".into(), 5.into()]);
    assert!(evaluate(&missing, &bindings()).unwrap().is_undefined());
}

#[test]
fn path_or_takes_default_first() {
    let e = Expr::call("pathOr", [Expr::lit(0), Expr::var("order"), "discount".into()]);
    assert_eq!(evaluate(&e, &bindings()).unwrap(), Value::from(0));
}

#[test]
fn has_size_counts_characters_and_items() {
    let chars = Expr::call("hasSize", [Expr::var("name"), Expr::lit(3)]);
    let lines = Expr::call(
        "hasSize",
        [
            Expr::call("path", [Expr::var("order"), "lines".into()]),
            Expr::matcher(|n| n.as_number().is_some_and(|n| n >= 1.0)),
        ],
    );
    assert_eq!(evaluate(&chars, &bindings()).unwrap(), Value::from(true));
    assert_eq!(evaluate(&lines, &bindings()).unwrap(), Value::from(true));
}

#[test]
fn unbound_variables_depend_on_mode() {
    let e = Expr::call("isDefined", [Expr::var("nothing")]);
    let err = evaluate(&e, &bindings()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnboundVariable(_)));
    assert_eq!(evaluate_lenient(&e, &bindings()).unwrap(), Value::from(false));
}

#[test]
fn unknown_operator_is_a_guard_error() {
    let e = Expr::call("nope", [Expr::lit(1)]);
    let err = evaluate(&e, &bindings()).unwrap_err();
    assert!(err.to_string().contains("unknown operator 'nope'"));
}
