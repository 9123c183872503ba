//! The inference orchestrator.
//!
//! [`Engine`] owns working memory, definitions, the agenda and the
//! truth-maintenance tables. Each call to [`Engine::activations`] drives the
//! run loop:
//!
//! 1. Pop the oldest task from the agenda
//! 2. For a retract task, run truth maintenance
//! 3. For an assert task, join every rule against working memory, pick one
//!    activation by salience, check its `pre` guards and fire it
//! 4. Yield the fired activation; repeat until the agenda is empty
//!
//! Facts asserted by an action are queued and handled only after the current
//! activation's whole lifecycle, `after` hook included, has finished.

mod context;
mod join;
mod truth;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ember_foundation::{
    Error, ErrorKind, FactId, FactRef, KIND_FIELD, Record, Result, Value,
};
use ember_storage::{ActivationId, FactEntry, FactMeta, FactSchema, FactStore, SchemaRegistry};
use tracing::{debug, error, warn};

use crate::agenda::{Agenda, Task, TaskKind};
use crate::conflict::resolve;
use crate::event::{DefinitionKind, EngineEvent, ListenerId, Notifier};
use crate::pattern::{Bindings, Pattern, match_pattern};
use crate::query::Query;
use crate::rule::Rule;

pub use context::ActionContext;
pub use truth::Justification;

use truth::TrackedActivation;

/// Kind of the facts created by [`ActionContext::publish`].
pub const EVENT_KIND: &str = "Event";

// =============================================================================
// Configuration
// =============================================================================

/// Engine settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum activations fired per run before it stops with
    /// [`ErrorKind::LimitExceeded`]. `None` means unlimited.
    pub max_activations: Option<usize>,
    /// Log every firing at `info` level regardless of rule log flags.
    pub trace_rules: bool,
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the activation limit (kill switch).
    #[must_use]
    pub fn with_max_activations(mut self, max: usize) -> Self {
        self.max_activations = Some(max);
        self
    }

    /// Enables firing logs for every rule.
    #[must_use]
    pub fn with_trace_rules(mut self, enabled: bool) -> Self {
        self.trace_rules = enabled;
        self
    }
}

// =============================================================================
// Run Results
// =============================================================================

/// An activation that went through the action lifecycle.
#[derive(Clone, Debug)]
pub struct FiredActivation {
    /// Activation identity.
    pub id: ActivationId,
    /// Rule that fired.
    pub rule_id: Arc<str>,
    /// Bindings the action ran with.
    pub bindings: Bindings,
    /// Facts consumed by the rule's pattern conditions.
    pub consumed: Vec<FactId>,
    /// Unhandled error from the action, if any.
    pub error: Option<Error>,
}

impl FiredActivation {
    /// Returns true if the lifecycle finished without an unhandled error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Counters for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks taken from the agenda.
    pub tasks: usize,
    /// Activations fired.
    pub fired: usize,
    /// Fired activations that ended in an unhandled error.
    pub failed: usize,
}

// =============================================================================
// Definitions
// =============================================================================

#[derive(Clone, Debug)]
enum Definition {
    Rule(Rc<Rule>),
    Query(Rc<Query>),
}

impl Definition {
    fn id(&self) -> &Arc<str> {
        match self {
            Self::Rule(rule) => &rule.id,
            Self::Query(query) => &query.id,
        }
    }

    fn kind(&self) -> DefinitionKind {
        match self {
            Self::Rule(_) => DefinitionKind::Rule,
            Self::Query(_) => DefinitionKind::Query,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// A forward-chaining inference engine.
pub struct Engine {
    config: EngineConfig,
    store: FactStore,
    schemas: SchemaRegistry,
    agenda: Agenda,
    definitions: Vec<Definition>,
    tracked: BTreeMap<ActivationId, TrackedActivation>,
    next_activation: u64,
    notifier: Notifier,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("facts", &self.store.len())
            .field("pending_tasks", &self.agenda.len())
            .field(
                "definitions",
                &self.definitions.iter().map(Definition::id).collect::<Vec<_>>(),
            )
            .field("tracked_activations", &self.tracked.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            store: FactStore::new(),
            schemas: SchemaRegistry::new(),
            agenda: Agenda::new(),
            definitions: Vec::new(),
            tracked: BTreeMap::new(),
            next_activation: 1,
            notifier: Notifier::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the event notifier.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Registers an event listener.
    pub fn subscribe(&self, listener: impl Fn(&EngineEvent) + 'static) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    /// Removes an event listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn notify(&self, event: impl FnOnce() -> EngineEvent) {
        if !self.notifier.is_empty() {
            self.notifier.emit(&event());
        }
    }

    // -------------------------------------------------------------------------
    // Schemas
    // -------------------------------------------------------------------------

    /// Registers (or replaces) the schema for a fact kind.
    pub fn register_schema(&mut self, schema: FactSchema) {
        self.schemas.register(schema);
    }

    /// Returns the schema registry.
    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    // -------------------------------------------------------------------------
    // Definitions
    // -------------------------------------------------------------------------

    /// Adds a rule, replacing any definition with the same id.
    ///
    /// # Errors
    /// Returns a definition error if the id is blank.
    pub fn add_rule(&mut self, rule: Rule) -> Result<()> {
        self.add_definition(Definition::Rule(Rc::new(rule)))
    }

    /// Adds a query, replacing any definition with the same id.
    ///
    /// # Errors
    /// Returns a definition error if the id is blank.
    pub fn add_query(&mut self, query: Query) -> Result<()> {
        self.add_definition(Definition::Query(Rc::new(query)))
    }

    fn add_definition(&mut self, definition: Definition) -> Result<()> {
        let id = Arc::clone(definition.id());
        let kind = definition.kind();
        if id.trim().is_empty() {
            let error = Error::definition(format!("{kind} id must not be blank"));
            warn!(%error, "definition rejected");
            self.notify(|| EngineEvent::EngineError {
                source: None,
                error: error.clone(),
            });
            return Err(error);
        }

        let replaced = match self.definitions.iter_mut().find(|d| *d.id() == id) {
            Some(slot) => {
                *slot = definition;
                true
            }
            None => {
                self.definitions.push(definition);
                false
            }
        };
        debug!(%id, %kind, replaced, "definition added");
        self.notify(|| EngineEvent::DefinitionAdded { id, kind, replaced });
        Ok(())
    }

    /// Removes a rule or query. Returns false if no definition had this id.
    pub fn remove_definition(&mut self, id: &str) -> bool {
        let Some(index) = self.definitions.iter().position(|d| &**d.id() == id) else {
            return false;
        };
        let definition = self.definitions.remove(index);
        debug!(id, "definition removed");
        self.notify(|| EngineEvent::DefinitionRemoved {
            id: Arc::clone(definition.id()),
            kind: definition.kind(),
        });
        true
    }

    /// Returns a rule by id.
    #[must_use]
    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules().find(|r| &*r.id == id).map(|r| &**r)
    }

    /// Returns a query definition by id.
    #[must_use]
    pub fn query_definition(&self, id: &str) -> Option<&Query> {
        self.definitions.iter().find_map(|d| match d {
            Definition::Query(q) if &*q.id == id => Some(&**q),
            _ => None,
        })
    }

    /// Ids of all definitions in insertion order.
    pub fn definition_ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| &**d.id())
    }

    fn rules(&self) -> impl Iterator<Item = &Rc<Rule>> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Rule(rule) => Some(rule),
            Definition::Query(_) => None,
        })
    }

    // -------------------------------------------------------------------------
    // Facts
    // -------------------------------------------------------------------------

    /// Validates and stores a fact, queueing an assert task.
    ///
    /// # Errors
    /// Returns a validation error if the record has no kind or violates its
    /// schema; nothing is stored in that case.
    pub fn assert(&mut self, record: Record) -> Result<FactRef> {
        self.insert_fact(record, FactMeta::stated())
    }

    /// Removes a fact, queueing a retract task.
    pub fn retract(&mut self, id: FactId) -> Option<FactRef> {
        self.remove_fact(id)
    }

    /// Replaces a fact with a copy whose fields are overlaid with `changes`.
    /// The result has a new identity.
    ///
    /// # Errors
    /// Returns [`ErrorKind::FactNotFound`] for an unknown id, or a validation
    /// error, in which case the original fact is kept.
    pub fn modify(&mut self, id: FactId, changes: Record) -> Result<FactRef> {
        let current = self.existing(id)?;
        self.replace(id, current.fields().union(&changes))
    }

    /// Replaces a fact with `record`, keeping the old kind if `record` has
    /// none. The result has a new identity.
    ///
    /// # Errors
    /// Same as [`Engine::modify`].
    pub fn update(&mut self, id: FactId, record: Record) -> Result<FactRef> {
        let current = self.existing(id)?;
        let record = if record.contains_key(KIND_FIELD) {
            record
        } else {
            record.insert(Arc::from(KIND_FIELD), Value::from(current.kind()))
        };
        self.replace(id, record)
    }

    /// Retracts every fact of `kind` matching `pattern`.
    pub fn retract_matching(&mut self, kind: &str, pattern: &Pattern) -> Vec<FactRef> {
        let empty = Bindings::new();
        let ids: Vec<FactId> = self
            .store
            .facts_of_kind(kind)
            .filter(|fact| match_pattern(pattern, &Value::Fact(Arc::clone(fact)), &empty).is_match)
            .map(|fact| fact.id())
            .collect();
        ids.into_iter().filter_map(|id| self.remove_fact(id)).collect()
    }

    /// Returns a fact by identity.
    #[must_use]
    pub fn fact(&self, id: FactId) -> Option<&FactRef> {
        self.store.fact(id)
    }

    /// Returns a fact with its metadata.
    #[must_use]
    pub fn entry(&self, id: FactId) -> Option<&FactEntry> {
        self.store.entry(id)
    }

    /// Iterates all facts in identity order.
    pub fn facts(&self) -> impl Iterator<Item = &FactRef> {
        self.store.entries().map(|entry| &entry.fact)
    }

    /// Iterates the facts of one kind.
    pub fn facts_of_kind<'a>(&'a self, kind: &str) -> impl Iterator<Item = &'a FactRef> + use<'a> {
        self.store.facts_of_kind(kind)
    }

    /// Number of stored facts.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.store.len()
    }

    /// Number of tasks waiting on the agenda.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.agenda.len()
    }

    fn existing(&self, id: FactId) -> Result<FactRef> {
        self.store
            .fact(id)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::FactNotFound(id)))
    }

    fn replace(&mut self, id: FactId, record: Record) -> Result<FactRef> {
        let record = self.validate(record)?;
        self.remove_fact(id);
        self.store_fact(&record, FactMeta::stated())
    }

    fn insert_fact(&mut self, record: Record, meta: FactMeta) -> Result<FactRef> {
        let record = self.validate(record)?;
        self.store_fact(&record, meta)
    }

    fn validate(&self, record: Record) -> Result<Record> {
        if !matches!(record.get(KIND_FIELD), Some(Value::String(kind)) if !kind.is_empty()) {
            let error = Error::new(ErrorKind::MissingKind);
            warn!(%error, "fact rejected");
            self.notify(|| EngineEvent::SchemaError {
                error: error.clone(),
            });
            return Err(error);
        }
        self.schemas.validate(record).inspect_err(|error| {
            warn!(%error, "fact rejected");
            self.notify(|| EngineEvent::SchemaError {
                error: error.clone(),
            });
        })
    }

    fn store_fact(&mut self, record: &Record, meta: FactMeta) -> Result<FactRef> {
        let fact = self.store.assert(record, meta)?.fact;
        debug!(fact = %fact.id(), kind = fact.kind(), logical = meta.logical, "fact asserted");

        if let Some(activation) = meta.produced_by {
            if let Some(tracked) = self.tracked.get_mut(&activation) {
                tracked.produced.insert(fact.id());
            }
        }

        self.notify(|| EngineEvent::FactAsserted {
            fact: Arc::clone(&fact),
            logical: meta.logical,
            produced_by: meta.produced_by,
        });
        self.agenda.push(Task::assert(Arc::clone(&fact)));
        Ok(fact)
    }

    fn remove_fact(&mut self, id: FactId) -> Option<FactRef> {
        let fact = self.store.retract(id)?.fact;
        debug!(fact = %id, kind = fact.kind(), "fact retracted");
        self.notify(|| EngineEvent::FactRetracted {
            fact: Arc::clone(&fact),
        });
        self.agenda.push(Task::retract(Arc::clone(&fact)));
        Some(fact)
    }

    // -------------------------------------------------------------------------
    // Run loop
    // -------------------------------------------------------------------------

    /// Returns a lazy sequence of fired activations. Each `next` processes
    /// tasks until one activation fires or the agenda is empty.
    pub fn activations(&mut self) -> Activations<'_> {
        Activations {
            engine: self,
            summary: RunSummary::default(),
            halted: false,
        }
    }

    /// Runs until the agenda is empty.
    ///
    /// # Errors
    /// Returns [`ErrorKind::LimitExceeded`] if the activation limit is hit.
    /// Action errors never stop the run.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.run_with(|_| {})
    }

    /// Runs until the agenda is empty, calling `observer` for every fired
    /// activation.
    ///
    /// # Errors
    /// Same as [`Engine::run`].
    pub fn run_with(&mut self, mut observer: impl FnMut(&FiredActivation)) -> Result<RunSummary> {
        let mut activations = self.activations();
        for fired in activations.by_ref() {
            observer(&fired?);
        }
        Ok(activations.summary())
    }

    fn process(&mut self, task: Task, may_fire: bool) -> Result<Option<FiredActivation>> {
        debug!(kind = ?task.kind, fact = %task.fact.id(), "processing task");
        if task.kind == TaskKind::Retract {
            self.maintain_truth(task.fact.id());
            return Ok(None);
        }

        let candidates = self.find_activations();
        let trigger = task.fact.id();
        let count = candidates.len();
        debug!(%trigger, count, "activations found");
        self.notify(|| EngineEvent::ActivationsFound { trigger, count });

        let Some(activation) = resolve(candidates) else {
            return Ok(None);
        };
        self.notify(|| EngineEvent::ActivationSelected {
            rule: Arc::clone(&activation.rule.id),
            bindings: activation.bindings.clone(),
        });

        if !self.pre_conditions_pass(&activation) {
            return Ok(None);
        }

        if !may_fire {
            let error = Error::limit_exceeded(self.config.max_activations.unwrap_or_default());
            error!(%error, rule = %activation.rule.id, "run halted");
            self.notify(|| EngineEvent::EngineError {
                source: Some(Arc::clone(&activation.rule.id)),
                error: error.clone(),
            });
            self.agenda.unshift(task);
            return Err(error);
        }

        Ok(Some(self.fire(activation)))
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    /// Clears working memory, the agenda and truth-maintenance state.
    /// Definitions, schemas and listeners are kept; identities restart at 1.
    pub fn reset(&mut self) {
        self.store.clear();
        self.agenda.clear();
        self.tracked.clear();
        self.next_activation = 1;
        debug!("engine reset");
    }
}

// =============================================================================
// Activations
// =============================================================================

/// Lazy sequence of fired activations, returned by [`Engine::activations`].
///
/// After an error (the activation limit) the sequence ends; calling
/// [`Engine::activations`] again resumes with the remaining tasks.
pub struct Activations<'e> {
    engine: &'e mut Engine,
    summary: RunSummary,
    halted: bool,
}

impl Activations<'_> {
    /// Counters so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.summary
    }
}

impl Iterator for Activations<'_> {
    type Item = Result<FiredActivation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        while let Some(task) = self.engine.agenda.shift() {
            let may_fire = self
                .engine
                .config
                .max_activations
                .is_none_or(|max| self.summary.fired < max);
            match self.engine.process(task, may_fire) {
                Ok(None) => self.summary.tasks += 1,
                Ok(Some(fired)) => {
                    self.summary.tasks += 1;
                    self.summary.fired += 1;
                    if !fired.is_ok() {
                        self.summary.failed += 1;
                    }
                    return Some(Ok(fired));
                }
                Err(error) => {
                    self.halted = true;
                    return Some(Err(error));
                }
            }
        }
        None
    }
}

impl fmt::Debug for Activations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activations")
            .field("summary", &self.summary)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
