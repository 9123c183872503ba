//! Pattern matching, rules, queries, and truth maintenance for Ember.
//!
//! This crate provides:
//! - [`match_pattern`] - Unification-style structural matching with bindings
//! - [`Accumulator`] - Aggregations over matched facts
//! - [`resolve`] - Salience-based conflict resolution
//! - [`Expr`] - Guard and projection expressions
//! - [`Rule`] / [`Query`] - Definitions built from [`Condition`]s
//! - [`Engine`] - The run loop, action lifecycle, and truth maintenance
//! - [`Notifier`] - Synchronous publish/subscribe for [`EngineEvent`]s

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod accumulate;
pub mod agenda;
pub mod condition;
pub mod conflict;
pub mod engine;
pub mod event;
pub mod expr;
pub mod pattern;
pub mod query;
pub mod rule;

pub use accumulate::{Accumulator, AccumulatorOp};
pub use agenda::{Agenda, Task, TaskKind};
pub use condition::{AccumulateCondition, Condition, LacksCondition, PatternCondition};
pub use conflict::{Activation, resolve};
pub use engine::{
    ActionContext, Activations, Engine, EngineConfig, FiredActivation, Justification,
    RunSummary,
};
pub use event::{DefinitionKind, EngineEvent, ListenerId, Notifier};
pub use expr::{Expr, evaluate, evaluate_lenient};
pub use pattern::{Bindings, MatchResult, Pattern, match_pattern};
pub use query::{Order, Query};
pub use rule::{Rule, RuleLog};
