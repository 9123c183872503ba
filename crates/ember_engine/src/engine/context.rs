//! Action execution and the context handed to rule code.

use std::fmt;
use std::rc::Rc;
use std::slice;
use std::sync::Arc;

use ember_foundation::{FactId, FactRef, KIND_FIELD, Record, Result, Value, record};
use ember_storage::{ActivationId, FactMeta};
use tracing::{error, info, warn};

use super::{EVENT_KIND, Engine, FiredActivation};
use crate::conflict::Activation;
use crate::event::EngineEvent;
use crate::expr::evaluate;
use crate::pattern::{Bindings, Pattern};
use crate::query::Query;
use crate::rule::Rule;

// =============================================================================
// ActionContext
// =============================================================================

/// What a rule action, hook or error handler can see and do.
///
/// Facts asserted or retracted through the context are queued on the agenda
/// and processed after the current activation finishes.
pub struct ActionContext<'e> {
    engine: &'e mut Engine,
    rule: Rc<Rule>,
    activation: ActivationId,
    bindings: Bindings,
}

impl<'e> ActionContext<'e> {
    fn new(engine: &'e mut Engine, rule: Rc<Rule>, activation: ActivationId, bindings: Bindings) -> Self {
        Self {
            engine,
            rule,
            activation,
            bindings,
        }
    }

    /// The activation's bindings.
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Looks up a binding. `name` may omit the `?` sigil.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name).or_else(|| {
            if name.starts_with('?') {
                None
            } else {
                self.bindings.get(format!("?{name}").as_str())
            }
        })
    }

    /// Returns the fact bound to a condition alias.
    #[must_use]
    pub fn fact(&self, alias: &str) -> Option<&FactRef> {
        self.get(alias).and_then(Value::as_fact)
    }

    /// The firing rule's id.
    #[must_use]
    pub fn rule_id(&self) -> &str {
        &self.rule.id
    }

    /// The firing activation's identity.
    #[must_use]
    pub fn activation_id(&self) -> ActivationId {
        self.activation
    }

    /// Read access to the engine.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &*self.engine
    }

    /// Asserts a stated fact.
    ///
    /// # Errors
    /// Returns a validation error if the record is rejected.
    pub fn assert(&mut self, record: Record) -> Result<FactRef> {
        self.engine.insert_fact(record, FactMeta::stated())
    }

    /// Asserts a fact justified by this activation. It is retracted
    /// automatically once any fact the activation consumed is retracted.
    ///
    /// # Errors
    /// Returns a validation error if the record is rejected.
    pub fn assert_logical(&mut self, record: Record) -> Result<FactRef> {
        self.engine.insert_fact(record, FactMeta::logical(self.activation))
    }

    /// Retracts a fact.
    pub fn retract(&mut self, id: FactId) -> Option<FactRef> {
        self.engine.remove_fact(id)
    }

    /// See [`Engine::modify`].
    ///
    /// # Errors
    /// Same as [`Engine::modify`].
    pub fn modify(&mut self, id: FactId, changes: Record) -> Result<FactRef> {
        self.engine.modify(id, changes)
    }

    /// See [`Engine::update`].
    ///
    /// # Errors
    /// Same as [`Engine::update`].
    pub fn update(&mut self, id: FactId, record: Record) -> Result<FactRef> {
        self.engine.update(id, record)
    }

    /// See [`Engine::retract_matching`].
    pub fn retract_matching(&mut self, kind: &str, pattern: &Pattern) -> Vec<FactRef> {
        self.engine.retract_matching(kind, pattern)
    }

    /// Adds a rule; it takes part from the next task on.
    ///
    /// # Errors
    /// Same as [`Engine::add_rule`].
    pub fn add_rule(&mut self, rule: Rule) -> Result<()> {
        self.engine.add_rule(rule)
    }

    /// Adds a query.
    ///
    /// # Errors
    /// Same as [`Engine::add_query`].
    pub fn add_query(&mut self, query: Query) -> Result<()> {
        self.engine.add_query(query)
    }

    /// Removes a rule or query. The running activation is unaffected.
    pub fn remove_definition(&mut self, id: &str) -> bool {
        self.engine.remove_definition(id)
    }

    /// Asserts an `Event` fact carrying `name` and `payload`.
    ///
    /// # Errors
    /// Returns a validation error if an `Event` schema rejects it.
    pub fn publish(&mut self, name: &str, payload: impl Into<Value>) -> Result<FactRef> {
        self.assert(record([
            (KIND_FIELD, Value::from(EVENT_KIND)),
            ("name", Value::from(name)),
            ("payload", payload.into()),
        ]))
    }

    /// Runs a query against current working memory.
    ///
    /// # Errors
    /// Same as [`Engine::query_with`].
    pub fn query(&self, id: &str, params: &Bindings) -> Result<Vec<Record>> {
        self.engine.query_with(id, params)
    }

    // Action, `throws` dispatch, then post-condition checks.
    fn proceed(&mut self) -> Result<()> {
        let rule = Rc::clone(&self.rule);
        let outcome = match (rule.action)(self) {
            Ok(()) => Ok(()),
            Err(error) => match rule.handler(error.kind_name()) {
                Some(handler) => {
                    info!(rule = %rule.id, %error, "action error handled");
                    self.engine.notify(|| EngineEvent::ActionErrorHandled {
                        rule: Arc::clone(&rule.id),
                        error: error.clone(),
                    });
                    handler(self, &error)
                }
                None => Err(error),
            },
        };
        if outcome.is_ok() {
            self.check_post_conditions(&rule);
        }
        outcome
    }

    fn check_post_conditions(&self, rule: &Rule) {
        for (index, condition) in rule.post.iter().enumerate() {
            let matches = self.engine.collect_matches(
                slice::from_ref(condition),
                &self.bindings,
                &rule.id,
                Some(1),
            );
            if matches.is_empty() {
                warn!(rule = %rule.id, index, "post-condition not satisfied");
                self.engine.notify(|| EngineEvent::PostConditionFailed {
                    rule: Arc::clone(&rule.id),
                    index,
                });
            }
        }
    }
}

impl fmt::Debug for ActionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("rule", &self.rule.id)
            .field("activation", &self.activation)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

fn proceed(ctx: &mut ActionContext<'_>) -> Result<()> {
    ctx.proceed()
}

// =============================================================================
// Lifecycle
// =============================================================================

impl Engine {
    pub(super) fn pre_conditions_pass(&self, activation: &Activation) -> bool {
        let rule = &activation.rule;
        for guard in &rule.pre {
            match evaluate(guard, &activation.bindings) {
                Ok(value) if value.is_truthy() => {}
                Ok(_) => {
                    self.notify(|| EngineEvent::PreConditionFailed {
                        rule: Arc::clone(&rule.id),
                        error: None,
                    });
                    return false;
                }
                Err(error) => {
                    warn!(rule = %rule.id, %guard, %error, "pre-condition failed");
                    self.notify(|| EngineEvent::GuardError {
                        source: Arc::clone(&rule.id),
                        guard: guard.to_string(),
                        error: error.clone(),
                    });
                    self.notify(|| EngineEvent::PreConditionFailed {
                        rule: Arc::clone(&rule.id),
                        error: Some(error),
                    });
                    return false;
                }
            }
        }
        self.notify(|| EngineEvent::PreConditionPassed {
            rule: Arc::clone(&rule.id),
        });
        true
    }

    pub(super) fn fire(&mut self, activation: Activation) -> FiredActivation {
        let id = self.track(&activation);
        let rule = Rc::clone(&activation.rule);

        if self.config.trace_rules || rule.log.fired {
            if rule.log.bindings {
                info!(rule = %rule.id, %id, bindings = ?activation.bindings, "rule fired");
            } else {
                info!(rule = %rule.id, %id, "rule fired");
            }
        }

        let outcome = {
            let mut ctx = ActionContext::new(self, Rc::clone(&rule), id, activation.bindings.clone());
            let outcome = match &rule.around {
                Some(around) => around(&mut ctx, &mut proceed),
                None => ctx.proceed(),
            };
            if let Some(after) = &rule.after {
                if let Err(error) = after(&mut ctx, outcome.as_ref().err()) {
                    warn!(rule = %rule.id, %error, "after hook failed");
                    ctx.engine.notify(|| EngineEvent::HookError {
                        rule: Arc::clone(&rule.id),
                        hook: "after",
                        error,
                    });
                }
            }
            outcome
        };

        if let Err(error) = &outcome {
            error!(rule = %rule.id, %id, %error, "unhandled action error");
            self.notify(|| EngineEvent::EngineError {
                source: Some(Arc::clone(&rule.id)),
                error: error.clone(),
            });
        }

        self.untrack_if_idle(id);
        self.notify(|| EngineEvent::ActivationFired {
            activation: id,
            rule: Arc::clone(&rule.id),
            failed: outcome.is_err(),
        });

        FiredActivation {
            id,
            rule_id: Arc::clone(&rule.id),
            bindings: activation.bindings,
            consumed: activation.consumed,
            error: outcome.err(),
        }
    }
}
