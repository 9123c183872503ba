//! Engine events and the synchronous notifier.
//!
//! Every observable step of the engine is published as an [`EngineEvent`].
//! Listeners run synchronously on the emitting thread; a listener that
//! panics is logged and skipped, and never disturbs the engine or the other
//! listeners.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use ember_foundation::{Error, FactId, FactRef};
use ember_storage::ActivationId;
use tracing::warn;

use crate::pattern::Bindings;

/// Which kind of definition an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefinitionKind {
    /// A rule.
    Rule,
    /// A query.
    Query,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => write!(f, "rule"),
            Self::Query => write!(f, "query"),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Something the engine did.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    /// A rule or query was added or replaced.
    DefinitionAdded {
        /// Definition id.
        id: Arc<str>,
        /// Rule or query.
        kind: DefinitionKind,
        /// True if an existing definition with the same id was replaced.
        replaced: bool,
    },
    /// A definition was removed.
    DefinitionRemoved {
        /// Definition id.
        id: Arc<str>,
        /// Rule or query.
        kind: DefinitionKind,
    },
    /// A fact entered the store.
    FactAsserted {
        /// The stored fact.
        fact: FactRef,
        /// True for logical assertions.
        logical: bool,
        /// Activation that produced the fact, if any.
        produced_by: Option<ActivationId>,
    },
    /// A fact left the store.
    FactRetracted {
        /// The removed fact.
        fact: FactRef,
    },
    /// A record failed schema validation.
    SchemaError {
        /// The validation error.
        error: Error,
    },
    /// Rules were matched after an assert task.
    ActivationsFound {
        /// Fact whose assertion triggered the match.
        trigger: FactId,
        /// Number of candidate activations.
        count: usize,
    },
    /// Conflict resolution picked an activation.
    ActivationSelected {
        /// Rule id.
        rule: Arc<str>,
        /// The activation's bindings.
        bindings: Bindings,
    },
    /// Every pre-condition guard was truthy.
    PreConditionPassed {
        /// Rule id.
        rule: Arc<str>,
    },
    /// A pre-condition guard was falsy or failed.
    PreConditionFailed {
        /// Rule id.
        rule: Arc<str>,
        /// Error if the guard failed to evaluate.
        error: Option<Error>,
    },
    /// A guard failed to evaluate.
    GuardError {
        /// Rule or query the guard belongs to.
        source: Arc<str>,
        /// The guard expression.
        guard: String,
        /// The evaluation error.
        error: Error,
    },
    /// An activation's action lifecycle finished.
    ActivationFired {
        /// Activation id.
        activation: ActivationId,
        /// Rule id.
        rule: Arc<str>,
        /// True if the lifecycle ended in an error.
        failed: bool,
    },
    /// A `throws` handler caught an action error.
    ActionErrorHandled {
        /// Rule id.
        rule: Arc<str>,
        /// The caught error.
        error: Error,
    },
    /// A post-condition had no match after the action.
    PostConditionFailed {
        /// Rule id.
        rule: Arc<str>,
        /// Position of the post-condition.
        index: usize,
    },
    /// An `after` hook failed.
    HookError {
        /// Rule id.
        rule: Arc<str>,
        /// Hook name.
        hook: &'static str,
        /// The hook's error.
        error: Error,
    },
    /// An operation failed.
    EngineError {
        /// Definition involved, if any.
        source: Option<Arc<str>>,
        /// The error.
        error: Error,
    },
    /// A projection expression could not be computed.
    ProjectionError {
        /// Query id.
        query: Arc<str>,
        /// Output field.
        field: Arc<str>,
        /// The error.
        error: Error,
    },
    /// A query started running.
    QueryStarted {
        /// Query id.
        query: Arc<str>,
    },
    /// A query finished.
    QueryCompleted {
        /// Query id.
        query: Arc<str>,
        /// Rows returned.
        rows: usize,
    },
    /// An activation lost its support because a consumed fact went away.
    ActivationInvalidated {
        /// The invalidated activation.
        activation: ActivationId,
        /// Its rule.
        rule: Arc<str>,
        /// The retracted fact.
        cause: FactId,
    },
    /// A logical fact was retracted by truth maintenance.
    LogicalRetracted {
        /// The retracted fact.
        fact: FactId,
        /// The activation that had justified it.
        activation: ActivationId,
    },
}

impl EngineEvent {
    /// Returns the stable event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DefinitionAdded { .. } => "definition-added",
            Self::DefinitionRemoved { .. } => "definition-removed",
            Self::FactAsserted { .. } => "fact-asserted",
            Self::FactRetracted { .. } => "fact-retracted",
            Self::SchemaError { .. } => "schema-error",
            Self::ActivationsFound { .. } => "activations-found",
            Self::ActivationSelected { .. } => "activation-selected",
            Self::PreConditionPassed { .. } => "pre-condition-passed",
            Self::PreConditionFailed { .. } => "pre-condition-failed",
            Self::GuardError { .. } => "guard-error",
            Self::ActivationFired { .. } => "activation-fired",
            Self::ActionErrorHandled { .. } => "action-error-handled",
            Self::PostConditionFailed { .. } => "post-condition-failed",
            Self::HookError { .. } => "hook-error",
            Self::EngineError { .. } => "engine-error",
            Self::ProjectionError { .. } => "projection-error",
            Self::QueryStarted { .. } => "query-started",
            Self::QueryCompleted { .. } => "query-completed",
            Self::ActivationInvalidated { .. } => "activation-invalidated",
            Self::LogicalRetracted { .. } => "logical-retracted",
        }
    }

    /// Returns true for events that report a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaError { .. }
                | Self::GuardError { .. }
                | Self::HookError { .. }
                | Self::EngineError { .. }
                | Self::ProjectionError { .. }
        ) || matches!(self, Self::ActivationFired { failed: true, .. })
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match self {
            Self::DefinitionAdded { id, kind, replaced } => {
                write!(f, " {kind} {id}")?;
                if *replaced {
                    write!(f, " (replaced)")?;
                }
                Ok(())
            }
            Self::DefinitionRemoved { id, kind } => write!(f, " {kind} {id}"),
            Self::FactAsserted { fact, logical, .. } => {
                write!(f, " {} {}", fact.kind(), fact.id())?;
                if *logical {
                    write!(f, " (logical)")?;
                }
                Ok(())
            }
            Self::FactRetracted { fact } => write!(f, " {} {}", fact.kind(), fact.id()),
            Self::SchemaError { error } => write!(f, ": {error}"),
            Self::ActivationsFound { trigger, count } => write!(f, " {count} for {trigger}"),
            Self::ActivationSelected { rule, .. }
            | Self::PreConditionPassed { rule }
            | Self::PreConditionFailed { rule, error: None } => write!(f, " {rule}"),
            Self::PreConditionFailed {
                rule,
                error: Some(error),
            } => write!(f, " {rule}: {error}"),
            Self::GuardError {
                source,
                guard,
                error,
            } => write!(f, " {source} {guard}: {error}"),
            Self::ActivationFired {
                activation,
                rule,
                failed,
            } => {
                write!(f, " {rule} {activation}")?;
                if *failed {
                    write!(f, " (failed)")?;
                }
                Ok(())
            }
            Self::ActionErrorHandled { rule, error } => write!(f, " {rule}: {error}"),
            Self::PostConditionFailed { rule, index } => write!(f, " {rule} #{index}"),
            Self::HookError { rule, hook, error } => write!(f, " {rule} {hook}: {error}"),
            Self::EngineError {
                source: Some(source),
                error,
            } => write!(f, " {source}: {error}"),
            Self::EngineError {
                source: None,
                error,
            } => write!(f, ": {error}"),
            Self::ProjectionError {
                query,
                field,
                error,
            } => write!(f, " {query}.{field}: {error}"),
            Self::QueryStarted { query } => write!(f, " {query}"),
            Self::QueryCompleted { query, rows } => write!(f, " {query} ({rows} rows)"),
            Self::ActivationInvalidated {
                activation,
                rule,
                cause,
            } => write!(f, " {rule} {activation} by {cause}"),
            Self::LogicalRetracted { fact, activation } => write!(f, " {fact} from {activation}"),
        }
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// Handle returned by [`Notifier::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

type Listener = Rc<dyn Fn(&EngineEvent)>;

#[derive(Default)]
struct Listeners {
    entries: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

/// Synchronous publish/subscribe hub.
///
/// Clones share the same listener list, so a clone handed to a listener can
/// subscribe or unsubscribe during dispatch. Such changes take effect from
/// the next event.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Rc<RefCell<Listeners>>,
}

impl Notifier {
    /// Creates a notifier with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn subscribe(&self, listener: impl Fn(&EngineEvent) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = ListenerId(inner.next_id);
        inner.entries.push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.entries.len();
        inner.entries.retain(|(entry, _)| *entry != id);
        inner.entries.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Returns true if nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Delivers an event to every listener registered when the call began.
    pub fn emit(&self, event: &EngineEvent) {
        let snapshot: Vec<Listener> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();

        for listener in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
            if outcome.is_err() {
                warn!(event = event.name(), "event listener panicked");
            }
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.len())
            .finish()
    }
}
