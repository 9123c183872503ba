//! Property tests across the matcher, accumulators, conflict resolution, and
//! queries.

use std::cell::RefCell;
use std::rc::Rc;

use ember::engine::{
    Accumulator, Bindings, Condition, Engine, Order, Pattern, Query, Rule, match_pattern,
};
use ember::foundation::{Value, record};
use proptest::prelude::*;

fn engine_with_totals(totals: &[i32]) -> Engine {
    let mut engine = Engine::new();
    for (i, total) in totals.iter().enumerate() {
        engine
            .assert(record([
                ("kind", Value::from("Order")),
                ("i", Value::from(i)),
                ("total", Value::from(*total)),
            ]))
            .unwrap();
    }
    engine
}

fn by_total(offset: usize, limit: usize) -> Query {
    Query::new("by-total")
        .when(Condition::pattern(
            "Order",
            Pattern::record([("i", "?i"), ("total", "?total")]),
        ))
        .project("i", "?i")
        .project("total", "?total")
        .order_by("total", Order::Asc)
        .offset(offset)
        .limit(limit)
}

proptest! {
    #[test]
    fn destructuring_splits_head_middle_and_tail(items in prop::collection::vec(-50i32..50, 2..12)) {
        let pattern = Pattern::seq([Pattern::var("a"), Pattern::rest("mid"), Pattern::var("b")]);
        let value = Value::list(items.iter().copied());
        let r = match_pattern(&pattern, &value, &Bindings::new());

        prop_assert!(r.is_match);
        prop_assert_eq!(r.bindings.get("?a"), Some(&Value::from(items[0])));
        prop_assert_eq!(r.bindings.get("?b"), Some(&Value::from(items[items.len() - 1])));
        let middle = Value::list(items[1..items.len() - 1].iter().copied());
        prop_assert_eq!(r.bindings.get("?mid"), Some(&middle));
    }

    #[test]
    fn sum_matches_numeric_fields(totals in prop::collection::vec(-1000i32..1000, 0..20)) {
        let engine = engine_with_totals(&totals);
        let facts: Vec<_> = engine.facts_of_kind("Order").cloned().collect();
        let expected: i32 = totals.iter().sum();
        prop_assert_eq!(Accumulator::sum("total").apply(&facts), Value::from(expected));
        prop_assert_eq!(Accumulator::count().apply(&facts), Value::from(totals.len()));
    }

    #[test]
    fn highest_salience_always_fires(saliences in prop::collection::vec(-20i32..20, 1..8)) {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();
        for (i, salience) in saliences.iter().enumerate() {
            let sink = Rc::clone(&fired);
            engine
                .add_rule(
                    Rule::new(&format!("r{i}"), move |_| {
                        sink.borrow_mut().push(i);
                        Ok(())
                    })
                    .with_salience(*salience)
                    .when(Condition::pattern("Go", Pattern::Wildcard)),
                )
                .unwrap();
        }
        engine.assert(record([("kind", "Go")])).unwrap();
        engine.run().unwrap();

        let max = saliences.iter().copied().max().unwrap();
        let first_max = saliences.iter().position(|s| *s == max).unwrap();
        prop_assert_eq!(fired.borrow().clone(), vec![first_max]);
    }

    #[test]
    fn pages_are_slices_of_the_sorted_result(
        totals in prop::collection::vec(0i32..100, 0..15),
        offset in 0usize..20,
        limit in 1usize..20,
    ) {
        let mut engine = engine_with_totals(&totals);
        engine.add_query(by_total(0, 0)).unwrap();
        let all = engine.query("by-total").unwrap();

        engine.add_query(by_total(offset, limit)).unwrap();
        let page = engine.query("by-total").unwrap();

        let expected: Vec<_> = all.iter().skip(offset).take(limit).cloned().collect();
        prop_assert_eq!(page, expected);

        let sorted: Vec<_> = all.iter().filter_map(|r| r.get("total").and_then(Value::as_number)).collect();
        prop_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    }
}
