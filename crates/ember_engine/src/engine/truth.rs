//! Truth maintenance.
//!
//! Every fired activation is tracked with the facts its pattern conditions
//! consumed and the logical facts it produced. When a consumed fact is
//! retracted, the activation loses its support: the logical facts it still
//! justifies are retracted, and each of those retractions is queued as an
//! ordinary retract task so deeper cascades run through the agenda.
//!
//! Accumulate and lacks conditions consume nothing, so a change in the facts
//! they aggregate or exclude never invalidates an activation.

use std::collections::BTreeSet;
use std::sync::Arc;

use ember_foundation::FactId;
use ember_storage::ActivationId;
use tracing::debug;

use super::Engine;
use crate::conflict::Activation;
use crate::event::EngineEvent;

#[derive(Clone, Debug)]
pub(super) struct TrackedActivation {
    pub(super) rule_id: Arc<str>,
    pub(super) consumed: BTreeSet<FactId>,
    pub(super) produced: BTreeSet<FactId>,
}

/// Why a logical fact exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Justification {
    /// The activation that produced the fact.
    pub activation: ActivationId,
    /// Its rule.
    pub rule_id: Arc<str>,
    /// Facts the activation consumed, in identity order.
    pub consumed: Vec<FactId>,
    /// Facts the activation logically produced, in identity order.
    pub produced: Vec<FactId>,
}

impl Engine {
    pub(super) fn track(&mut self, activation: &Activation) -> ActivationId {
        let id = ActivationId(self.next_activation);
        self.next_activation += 1;
        self.tracked.insert(
            id,
            TrackedActivation {
                rule_id: Arc::clone(&activation.rule.id),
                consumed: activation.consumed.iter().copied().collect(),
                produced: BTreeSet::new(),
            },
        );
        id
    }

    // An activation that produced nothing has nothing to maintain.
    pub(super) fn untrack_if_idle(&mut self, id: ActivationId) {
        if self.tracked.get(&id).is_some_and(|t| t.produced.is_empty()) {
            self.tracked.remove(&id);
        }
    }

    pub(super) fn maintain_truth(&mut self, retracted: FactId) {
        let invalidated: Vec<ActivationId> = self
            .tracked
            .iter()
            .filter(|(_, tracked)| tracked.consumed.contains(&retracted))
            .map(|(id, _)| *id)
            .collect();

        for activation in invalidated {
            let Some(tracked) = self.tracked.remove(&activation) else {
                continue;
            };
            debug!(%activation, rule = %tracked.rule_id, cause = %retracted, "activation invalidated");
            self.notify(|| EngineEvent::ActivationInvalidated {
                activation,
                rule: Arc::clone(&tracked.rule_id),
                cause: retracted,
            });

            for fact in tracked.produced {
                let justified = self
                    .store
                    .entry(fact)
                    .is_some_and(|entry| entry.is_justified_by(activation));
                if justified && self.remove_fact(fact).is_some() {
                    self.notify(|| EngineEvent::LogicalRetracted { fact, activation });
                }
            }
        }
    }

    /// Returns the justification of a logical fact, or `None` for stated
    /// facts and unknown ids.
    #[must_use]
    pub fn justification(&self, id: FactId) -> Option<Justification> {
        let entry = self.store.entry(id)?;
        let activation = entry.meta.produced_by.filter(|_| entry.meta.logical)?;
        let tracked = self.tracked.get(&activation)?;
        Some(Justification {
            activation,
            rule_id: Arc::clone(&tracked.rule_id),
            consumed: tracked.consumed.iter().copied().collect(),
            produced: tracked.produced.iter().copied().collect(),
        })
    }
}
