//! The condition join and query execution.
//!
//! Conditions are joined left to right as a nested loop over the facts of
//! each condition's kind. Every branch carries its own bindings; the
//! consumed-fact list is pushed and popped as the recursion descends and
//! returns.

use std::ops::ControlFlow;
use std::rc::Rc;
use std::sync::Arc;

use ember_foundation::{Error, ErrorKind, FactId, FactRef, Record, Result, Value};
use tracing::{debug, warn};

use super::{Definition, Engine};
use crate::condition::{Condition, PatternCondition};
use crate::conflict::Activation;
use crate::event::EngineEvent;
use crate::expr::{Expr, evaluate, evaluate_lenient};
use crate::pattern::{Bindings, Pattern, match_pattern};
use crate::query::Query;

impl Engine {
    /// Joins `conditions` under `bindings`, calling `on_match` with the
    /// bindings and consumed facts of every complete match.
    pub(super) fn join<F>(
        &self,
        conditions: &[Condition],
        bindings: &Bindings,
        consumed: &mut Vec<FactId>,
        source: &Arc<str>,
        on_match: &mut F,
    ) -> ControlFlow<()>
    where
        F: FnMut(&Bindings, &[FactId]) -> ControlFlow<()>,
    {
        let Some((head, rest)) = conditions.split_first() else {
            return on_match(bindings, consumed);
        };

        match head {
            Condition::Lacks(lacks) => {
                let present = self
                    .store
                    .facts_of_kind(&lacks.kind)
                    .any(|fact| matches_fact(&lacks.pattern, fact, bindings));
                if present {
                    ControlFlow::Continue(())
                } else {
                    self.join(rest, bindings, consumed, source, on_match)
                }
            }
            Condition::Accumulate(acc) => {
                let matched: Vec<FactRef> = self
                    .store
                    .facts_of_kind(&acc.kind)
                    .filter(|fact| matches_fact(&acc.pattern, fact, bindings))
                    .cloned()
                    .collect();
                let result = acc.accumulator.apply(&matched);
                let bound = match_pattern(&Pattern::Var(Arc::clone(&acc.target)), &result, bindings);
                if bound.is_match {
                    self.join(rest, &bound.bindings, consumed, source, on_match)
                } else {
                    ControlFlow::Continue(())
                }
            }
            Condition::Pattern(pattern) => {
                for fact in self.store.facts_of_kind(&pattern.kind) {
                    let Some(extended) = bind_fact(pattern, fact, bindings) else {
                        continue;
                    };
                    if !self.guards_pass(&pattern.guards, &extended, source) {
                        continue;
                    }
                    consumed.push(fact.id());
                    let flow = self.join(rest, &extended, consumed, source, on_match);
                    consumed.pop();
                    if flow.is_break() {
                        return flow;
                    }
                }
                ControlFlow::Continue(())
            }
        }
    }

    fn guards_pass(&self, guards: &[Expr], bindings: &Bindings, source: &Arc<str>) -> bool {
        guards.iter().all(|guard| match evaluate(guard, bindings) {
            Ok(value) => value.is_truthy(),
            Err(error) => {
                debug!(%source, %guard, %error, "guard failed");
                self.notify(|| EngineEvent::GuardError {
                    source: Arc::clone(source),
                    guard: guard.to_string(),
                    error,
                });
                false
            }
        })
    }

    /// Collects the bindings of up to `limit` matches.
    pub(super) fn collect_matches(
        &self,
        conditions: &[Condition],
        bindings: &Bindings,
        source: &Arc<str>,
        limit: Option<usize>,
    ) -> Vec<Bindings> {
        let mut found = Vec::new();
        let mut consumed = Vec::new();
        let _ = self.join(
            conditions,
            bindings,
            &mut consumed,
            source,
            &mut |matched: &Bindings, _: &[FactId]| {
                found.push(matched.clone());
                if limit.is_some_and(|n| found.len() >= n) {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );
        found
    }

    /// Joins every rule against working memory.
    pub(super) fn find_activations(&self) -> Vec<Activation> {
        let mut found = Vec::new();
        for rule in self.rules() {
            let mut consumed = Vec::new();
            let _ = self.join(
                &rule.when,
                &Bindings::new(),
                &mut consumed,
                &rule.id,
                &mut |bindings: &Bindings, ids: &[FactId]| {
                    found.push(Activation {
                        rule: Rc::clone(rule),
                        bindings: bindings.clone(),
                        consumed: ids.to_vec(),
                    });
                    ControlFlow::Continue(())
                },
            );
        }
        found
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Runs a query with no initial bindings.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UnknownDefinition`] if no query has this id.
    pub fn query(&self, id: &str) -> Result<Vec<Record>> {
        self.run_query(id, &Bindings::new(), None)
    }

    /// Runs a query starting from caller-supplied bindings.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UnknownDefinition`] if no query has this id.
    pub fn query_with(&self, id: &str, params: &Bindings) -> Result<Vec<Record>> {
        self.run_query(id, params, None)
    }

    /// Returns the first row of a query, stopping the join early when the
    /// query neither sorts, deduplicates nor skips rows.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UnknownDefinition`] if no query has this id.
    pub fn query_first(&self, id: &str, params: &Bindings) -> Result<Option<Record>> {
        Ok(self.run_query(id, params, Some(1))?.into_iter().next())
    }

    /// Returns true if a query has at least one row.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UnknownDefinition`] if no query has this id.
    pub fn query_exists(&self, id: &str, params: &Bindings) -> Result<bool> {
        Ok(self.query_first(id, params)?.is_some())
    }

    /// Returns the number of rows a query produces.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UnknownDefinition`] if no query has this id.
    pub fn query_count(&self, id: &str, params: &Bindings) -> Result<usize> {
        Ok(self.run_query(id, params, None)?.len())
    }

    fn lookup_query(&self, id: &str) -> Result<Rc<Query>> {
        let found = self.definitions.iter().find_map(|d| match d {
            Definition::Query(query) if &*query.id == id => Some(Rc::clone(query)),
            _ => None,
        });
        found.ok_or_else(|| {
            let error = Error::unknown_definition(id);
            self.notify(|| EngineEvent::EngineError {
                source: Some(Arc::from(id)),
                error: error.clone(),
            });
            error
        })
    }

    fn run_query(&self, id: &str, params: &Bindings, stop_after: Option<usize>) -> Result<Vec<Record>> {
        let query = self.lookup_query(id)?;
        self.notify(|| EngineEvent::QueryStarted {
            query: Arc::clone(&query.id),
        });

        let stop_after = stop_after.filter(|_| query.is_streaming());
        let matches = self.collect_matches(&query.when, params, &query.id, stop_after);
        let rows: Vec<Record> = match &query.projection {
            Some(fields) => matches
                .iter()
                .map(|bindings| self.project(&query, fields, bindings))
                .collect(),
            None => matches.iter().map(Bindings::user_variables).collect(),
        };
        let rows = query.shape(rows);

        debug!(query = %query.id, rows = rows.len(), "query completed");
        self.notify(|| EngineEvent::QueryCompleted {
            query: Arc::clone(&query.id),
            rows: rows.len(),
        });
        Ok(rows)
    }

    // A failing field becomes undefined; the row is still returned.
    fn project(&self, query: &Query, fields: &[(Arc<str>, Expr)], bindings: &Bindings) -> Record {
        let mut row = Record::new();
        for (field, expr) in fields {
            let value = project_field(field, expr, bindings).unwrap_or_else(|error| {
                warn!(query = %query.id, %field, %error, "projection failed");
                self.notify(|| EngineEvent::ProjectionError {
                    query: Arc::clone(&query.id),
                    field: Arc::clone(field),
                    error,
                });
                Value::Undefined
            });
            row = row.insert(Arc::clone(field), value);
        }
        row
    }
}

fn matches_fact(pattern: &Pattern, fact: &FactRef, bindings: &Bindings) -> bool {
    match_pattern(pattern, &Value::Fact(Arc::clone(fact)), bindings).is_match
}

// Matches the fact and binds the alias under both `?alias` and `alias`.
fn bind_fact(condition: &PatternCondition, fact: &FactRef, bindings: &Bindings) -> Option<Bindings> {
    let value = Value::Fact(Arc::clone(fact));
    let matched = match_pattern(&condition.pattern, &value, bindings);
    if !matched.is_match {
        return None;
    }
    let Some(alias) = &condition.alias else {
        return Some(matched.bindings);
    };
    let aliased = match_pattern(&Pattern::var(alias), &value, &matched.bindings);
    if !aliased.is_match {
        return None;
    }
    Some(aliased.bindings.with(Arc::clone(alias), value))
}

fn project_field(field: &str, expr: &Expr, bindings: &Bindings) -> Result<Value> {
    match expr {
        Expr::Var(name) if !bindings.contains(name) => Err(Error::new(ErrorKind::Projection {
            field: field.to_string(),
            message: format!("unbound variable {name}"),
        })),
        _ => evaluate_lenient(expr, bindings),
    }
}
