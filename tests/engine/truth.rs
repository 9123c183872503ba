//! Integration tests for truth maintenance
//!
//! Tests logical support, cascading retraction, and engine reset.

use std::cell::RefCell;
use std::rc::Rc;

use ember_engine::{Condition, Engine, EngineEvent, Pattern, PatternCondition, Rule};
use ember_foundation::{FactId, Value, record};

// Asserts `to` logically for every `from` fact lacking one, copying `zone`.
fn derive(id: &str, from: &str, to: &str) -> Rule {
    let produced = Value::from(to);
    Rule::new(id, move |ctx| {
        let zone = ctx.get("zone").cloned().unwrap_or(Value::Undefined);
        ctx.assert_logical(record([("kind", produced.clone()), ("zone", zone)]))?;
        Ok(())
    })
    .when(PatternCondition::new(from, Pattern::record([("zone", "?zone")])).with_alias("src"))
    .when(Condition::lacks(to, Pattern::record([("zone", "?zone")])))
}

fn smoke_chain() -> Engine {
    let mut engine = Engine::new();
    engine.add_rule(derive("alarm", "Smoke", "Alarm")).unwrap();
    engine.add_rule(derive("evacuate", "Alarm", "Evacuation")).unwrap();
    engine
}

fn smoke(zone: &str) -> ember_foundation::Record {
    record([("kind", "Smoke"), ("zone", zone)])
}

#[test]
fn derived_facts_record_their_support() {
    let mut engine = smoke_chain();
    let smoke = engine.assert(smoke("lab")).unwrap();
    engine.run().unwrap();

    let alarm = engine.facts_of_kind("Alarm").next().cloned().unwrap();
    let why = engine.justification(alarm.id()).unwrap();
    assert_eq!(&*why.rule_id, "alarm");
    assert_eq!(why.consumed, vec![smoke.id()]);
    assert!(engine.entry(alarm.id()).unwrap().meta.logical);
    assert!(engine.justification(smoke.id()).is_none());
}

#[test]
fn retraction_cascades_within_one_run() {
    let mut engine = smoke_chain();
    let smoke = engine.assert(smoke("lab")).unwrap();
    engine.run().unwrap();
    assert_eq!(engine.facts_of_kind("Evacuation").count(), 1);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    engine.subscribe(move |event| {
        if let EngineEvent::LogicalRetracted { fact, .. } = event {
            sink.borrow_mut().push(*fact);
        }
    });

    engine.retract(smoke.id());
    engine.run().unwrap();

    assert_eq!(engine.fact_count(), 0);
    assert_eq!(events.borrow().len(), 2);
}

#[test]
fn unrelated_support_is_untouched() {
    let mut engine = smoke_chain();
    let lab = engine.assert(smoke("lab")).unwrap();
    engine.assert(smoke("hall")).unwrap();
    engine.run().unwrap();
    assert_eq!(engine.facts_of_kind("Evacuation").count(), 2);

    engine.retract(lab.id());
    engine.run().unwrap();

    let zones: Vec<_> = engine
        .facts_of_kind("Evacuation")
        .map(|f| f.get("zone").cloned())
        .collect();
    assert_eq!(zones, vec![Some(Value::from("hall"))]);
}

#[test]
fn modifying_support_withdraws_then_rederives() {
    let mut engine = smoke_chain();
    let smoke = engine.assert(smoke("lab")).unwrap();
    engine.run().unwrap();
    let old_alarm = engine.facts_of_kind("Alarm").next().unwrap().id();

    engine.modify(smoke.id(), record([("zone", "attic")])).unwrap();
    engine.run().unwrap();

    assert!(engine.fact(old_alarm).is_none());
    let alarm = engine.facts_of_kind("Alarm").next().unwrap();
    assert_eq!(alarm.get("zone"), Some(&Value::from("attic")));
    assert_eq!(engine.facts_of_kind("Evacuation").count(), 1);
}

#[test]
fn stated_conclusions_are_not_maintained() {
    let mut engine = Engine::new();
    engine
        .add_rule(
            Rule::new("log", |ctx| {
                ctx.assert(record([("kind", "Log")]))?;
                Ok(())
            })
            .when(Condition::pattern("Smoke", Pattern::Wildcard))
            .when(Condition::lacks("Log", Pattern::Wildcard)),
        )
        .unwrap();
    let smoke = engine.assert(smoke("lab")).unwrap();
    engine.run().unwrap();
    engine.retract(smoke.id());
    engine.run().unwrap();

    assert_eq!(engine.facts_of_kind("Log").count(), 1);
}

#[test]
fn reset_clears_memory_but_keeps_rules() {
    let mut engine = smoke_chain();
    engine.assert(smoke("lab")).unwrap();
    engine.run().unwrap();

    engine.reset();
    assert_eq!(engine.fact_count(), 0);
    assert_eq!(engine.pending_tasks(), 0);
    assert_eq!(engine.definition_ids().count(), 2);

    let again = engine.assert(smoke("lab")).unwrap();
    assert_eq!(again.id(), FactId(1));
    engine.run().unwrap();
    assert_eq!(engine.facts_of_kind("Evacuation").count(), 1);
}
