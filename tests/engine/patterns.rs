//! Integration tests for structural pattern matching
//!
//! Tests binding, consistency, sequence destructuring, and record subsets.

use ember_engine::{Bindings, Pattern, match_pattern};
use ember_foundation::{Error, Value};

fn nums(items: &[i32]) -> Value {
    Value::list(items.iter().copied())
}

// =============================================================================
// Variables
// =============================================================================

#[test]
fn matching_never_mutates_input_bindings() {
    let before = Bindings::new().with("?x", 5);
    let snapshot = before.clone();

    let hit = match_pattern(&Pattern::var("y"), &Value::from(1), &before);
    let miss = match_pattern(&Pattern::var("x"), &Value::from(6), &before);

    assert!(hit.is_match);
    assert!(!miss.is_match);
    assert_eq!(before, snapshot);
    assert!(!before.contains("?y"));
}

#[test]
fn repeated_variable_must_agree() {
    let pair = Pattern::seq([Pattern::var("x"), Pattern::var("x")]);

    let same = match_pattern(&pair, &nums(&[5, 5]), &Bindings::new());
    assert!(same.is_match);
    assert_eq!(same.bindings.get("?x"), Some(&Value::from(5)));

    let differ = match_pattern(&pair, &nums(&[5, 6]), &Bindings::new());
    assert!(!differ.is_match);
}

#[test]
fn bound_data_is_rematched_as_a_pattern() {
    let bound = Bindings::new().with("?x", Value::list(["?head", "...?tail"]));
    let r = match_pattern(&"?x".into(), &nums(&[1, 2, 3]), &bound);

    assert!(r.is_match);
    assert_eq!(r.bindings.get("?head"), Some(&Value::from(1)));
    assert_eq!(r.bindings.get("?tail"), Some(&nums(&[2, 3])));

    let bound = Bindings::new().with("?x", "?y").with("?y", "z");
    assert!(match_pattern(&"?x".into(), &Value::from("z"), &bound).is_match);
    assert!(!match_pattern(&"?x".into(), &Value::from("w"), &bound).is_match);
}

// =============================================================================
// Sequences
// =============================================================================

#[test]
fn rest_captures_the_middle() {
    let pattern = Pattern::seq([Pattern::var("a"), Pattern::rest("mid"), Pattern::var("b")]);
    let r = match_pattern(&pattern, &nums(&[1, 2, 3, 4, 5]), &Bindings::new());

    assert!(r.is_match);
    assert_eq!(r.bindings.get("?a"), Some(&Value::from(1)));
    assert_eq!(r.bindings.get("?mid"), Some(&nums(&[2, 3, 4])));
    assert_eq!(r.bindings.get("?b"), Some(&Value::from(5)));
}

#[test]
fn rest_may_be_empty_but_fixed_items_may_not() {
    let pattern = Pattern::seq([Pattern::var("a"), Pattern::rest("mid"), Pattern::var("b")]);

    let two = match_pattern(&pattern, &nums(&[1, 2]), &Bindings::new());
    assert!(two.is_match);
    assert_eq!(two.bindings.get("?mid"), Some(&nums(&[])));

    assert!(!match_pattern(&pattern, &nums(&[1]), &Bindings::new()).is_match);
}

#[test]
fn from_plain_data_recognises_rest_marker() {
    let data = Value::list(["?first", "...?others"]);
    let r = match_pattern(&Pattern::from(data), &nums(&[7, 8, 9]), &Bindings::new());
    assert!(r.is_match);
    assert_eq!(r.bindings.get("?first"), Some(&Value::from(7)));
    assert_eq!(r.bindings.get("?others"), Some(&nums(&[8, 9])));
}

#[test]
fn two_rests_never_match() {
    let pattern = Pattern::seq([Pattern::rest("a"), Pattern::rest("b")]);
    assert!(!match_pattern(&pattern, &nums(&[1, 2]), &Bindings::new()).is_match);
}

#[test]
fn bare_rest_never_matches() {
    assert!(!match_pattern(&Pattern::rest("a"), &nums(&[1]), &Bindings::new()).is_match);
}

#[test]
fn sequence_pattern_rejects_non_sequences() {
    let pattern = Pattern::seq([Pattern::Wildcard]);
    assert!(!match_pattern(&pattern, &Value::from("x"), &Bindings::new()).is_match);
}

// =============================================================================
// Records
// =============================================================================

#[test]
fn record_pattern_matches_a_subset() {
    let order = Value::record([
        ("status", Value::from("open")),
        ("total", Value::from(40)),
        ("note", Value::Null),
    ]);
    let pattern = Pattern::record([("status", "open"), ("total", "?t")]);

    let r = match_pattern(&pattern, &order, &Bindings::new());
    assert!(r.is_match);
    assert_eq!(r.bindings.get("?t"), Some(&Value::from(40)));
    assert_eq!(r.bindings.len(), 1);
}

#[test]
fn record_pattern_fails_on_missing_field() {
    let pattern = Pattern::record([("missing", Pattern::Wildcard)]);
    let value = Value::record([("present", Value::from(1))]);
    assert!(!match_pattern(&pattern, &value, &Bindings::new()).is_match);
}

#[test]
fn predicates_filter_and_errors_fail() {
    let big = Pattern::record([("total", Pattern::predicate(|v| v.as_number().is_some_and(|n| n > 100.0)))]);
    let boom = Pattern::try_predicate(|_| Err(Error::guard("boom")));

    let small = Value::record([("total", Value::from(10))]);
    let large = Value::record([("total", Value::from(500))]);
    assert!(!match_pattern(&big, &small, &Bindings::new()).is_match);
    assert!(match_pattern(&big, &large, &Bindings::new()).is_match);
    assert!(!match_pattern(&boom, &large, &Bindings::new()).is_match);
}

#[test]
fn exact_match_uses_same_value_equality() {
    let nan = Pattern::exact(f64::NAN);
    assert!(match_pattern(&nan, &Value::from(f64::NAN), &Bindings::new()).is_match);
    assert!(!match_pattern(&Pattern::exact(0.0), &Value::from(-0.0), &Bindings::new()).is_match);
}
