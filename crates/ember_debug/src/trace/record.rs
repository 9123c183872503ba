//! Trace record type.

use ember_engine::EngineEvent;

/// A single recorded engine event.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    /// Buffer-assigned record id, strictly increasing.
    pub id: u64,
    /// Position of the event in the stream the tracer observed, counting
    /// events dropped by the filter.
    pub sequence: u64,
    /// Nanoseconds since the tracer was created.
    pub timestamp_ns: u64,
    /// The event.
    pub event: EngineEvent,
}

impl TraceRecord {
    /// Creates a new trace record.
    #[must_use]
    pub fn new(id: u64, sequence: u64, timestamp_ns: u64, event: EngineEvent) -> Self {
        Self {
            id,
            sequence,
            timestamp_ns,
            event,
        }
    }

    /// Returns the event name.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        self.event.name()
    }

    /// Returns true if the event reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.event.is_error()
    }

    /// Returns the rule or query the event concerns, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match &self.event {
            EngineEvent::DefinitionAdded { id, .. } | EngineEvent::DefinitionRemoved { id, .. } => {
                Some(id)
            }
            EngineEvent::ActivationSelected { rule, .. }
            | EngineEvent::PreConditionPassed { rule }
            | EngineEvent::PreConditionFailed { rule, .. }
            | EngineEvent::ActivationFired { rule, .. }
            | EngineEvent::ActionErrorHandled { rule, .. }
            | EngineEvent::PostConditionFailed { rule, .. }
            | EngineEvent::HookError { rule, .. }
            | EngineEvent::ActivationInvalidated { rule, .. } => Some(rule),
            EngineEvent::GuardError { source, .. } => Some(source),
            EngineEvent::EngineError { source, .. } => source.as_deref(),
            EngineEvent::ProjectionError { query, .. }
            | EngineEvent::QueryStarted { query }
            | EngineEvent::QueryCompleted { query, .. } => Some(query),
            EngineEvent::FactAsserted { .. }
            | EngineEvent::FactRetracted { .. }
            | EngineEvent::SchemaError { .. }
            | EngineEvent::ActivationsFound { .. }
            | EngineEvent::LogicalRetracted { .. } => None,
        }
    }
}
