//! Conflict resolution.

use std::rc::Rc;

use ember_foundation::FactId;

use crate::pattern::Bindings;
use crate::rule::Rule;

/// A rule together with one set of bindings that satisfies its conditions.
#[derive(Clone, Debug)]
pub struct Activation {
    /// The matched rule.
    pub rule: Rc<Rule>,
    /// Bindings produced by the join.
    pub bindings: Bindings,
    /// Facts consumed by pattern conditions, in join order.
    pub consumed: Vec<FactId>,
}

impl Activation {
    /// The rule's salience.
    #[must_use]
    pub fn salience(&self) -> i32 {
        self.rule.salience
    }

    /// The rule's id.
    #[must_use]
    pub fn rule_id(&self) -> &str {
        &self.rule.id
    }
}

/// Picks the activation with the highest salience. Ties go to the one that
/// came first.
pub fn resolve<I>(candidates: I) -> Option<Activation>
where
    I: IntoIterator<Item = Activation>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(best) if best.salience() >= candidate.salience() => Some(best),
        _ => Some(candidate),
    })
}
