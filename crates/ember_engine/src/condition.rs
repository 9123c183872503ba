//! Rule and query conditions.

use std::sync::Arc;

use crate::accumulate::Accumulator;
use crate::expr::Expr;
use crate::pattern::Pattern;

/// Matches facts of one kind, optionally naming the matched fact and
/// filtering candidates with guard expressions.
#[derive(Clone, Debug)]
pub struct PatternCondition {
    /// Fact kind to scan.
    pub kind: Arc<str>,
    /// Pattern matched against each fact.
    pub pattern: Pattern,
    /// Name the whole fact is bound to, without the sigil.
    pub alias: Option<Arc<str>>,
    /// Guards that must all be truthy for a candidate to join.
    pub guards: Vec<Expr>,
}

impl PatternCondition {
    /// Creates a pattern condition.
    #[must_use]
    pub fn new(kind: &str, pattern: impl Into<Pattern>) -> Self {
        Self {
            kind: Arc::from(kind),
            pattern: pattern.into(),
            alias: None,
            guards: Vec::new(),
        }
    }

    /// Binds the matched fact to `alias` (and `?alias`).
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(Arc::from(alias.trim_start_matches('?')));
        self
    }

    /// Adds a guard expression.
    #[must_use]
    pub fn with_guard(mut self, guard: Expr) -> Self {
        self.guards.push(guard);
        self
    }
}

/// Aggregates every fact of a kind that matches a source pattern and binds
/// the result to a variable.
#[derive(Clone, Debug)]
pub struct AccumulateCondition {
    /// Fact kind to scan.
    pub kind: Arc<str>,
    /// Source pattern; bindings it makes are discarded.
    pub pattern: Pattern,
    /// The aggregation.
    pub accumulator: Accumulator,
    /// Variable receiving the result, stored with its sigil.
    pub target: Arc<str>,
}

/// Negation as failure: satisfied only when no fact of the kind matches.
#[derive(Clone, Debug)]
pub struct LacksCondition {
    /// Fact kind to scan.
    pub kind: Arc<str>,
    /// Pattern that must match nothing.
    pub pattern: Pattern,
}

/// One entry of a `when` list.
#[derive(Clone, Debug)]
pub enum Condition {
    /// Join against matching facts.
    Pattern(PatternCondition),
    /// Bind an aggregate.
    Accumulate(AccumulateCondition),
    /// Require absence.
    Lacks(LacksCondition),
}

impl Condition {
    /// A pattern condition without alias or guards.
    #[must_use]
    pub fn pattern(kind: &str, pattern: impl Into<Pattern>) -> Self {
        Self::Pattern(PatternCondition::new(kind, pattern))
    }

    /// An accumulate condition.
    #[must_use]
    pub fn accumulate(
        kind: &str,
        pattern: impl Into<Pattern>,
        accumulator: Accumulator,
        target: &str,
    ) -> Self {
        let target = if target.starts_with('?') {
            Arc::from(target)
        } else {
            Arc::from(format!("?{target}"))
        };
        Self::Accumulate(AccumulateCondition {
            kind: Arc::from(kind),
            pattern: pattern.into(),
            accumulator,
            target,
        })
    }

    /// A negation condition.
    #[must_use]
    pub fn lacks(kind: &str, pattern: impl Into<Pattern>) -> Self {
        Self::Lacks(LacksCondition {
            kind: Arc::from(kind),
            pattern: pattern.into(),
        })
    }

    /// Returns the fact kind this condition scans.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Pattern(c) => &c.kind,
            Self::Accumulate(c) => &c.kind,
            Self::Lacks(c) => &c.kind,
        }
    }
}

impl From<PatternCondition> for Condition {
    fn from(c: PatternCondition) -> Self {
        Self::Pattern(c)
    }
}
