//! "Why does this fact exist?"
//!
//! A logical fact exists because an activation consumed some facts and
//! asserted it. Each consumed fact is either stated or itself logical, in
//! which case it is explained in turn. The result is a support tree rooted at
//! the fact being explained:
//!
//! ```text
//! Page #3 <- page (activation 2)
//!   Alarm #2 <- alarm (activation 1)
//!     Sensor #1 (stated)
//! ```

use std::fmt;

use ember_engine::{Engine, Justification};
use ember_foundation::{FactId, FactRef};
use ember_storage::ActivationId;

/// How many justification levels [`why`] follows.
pub const DEFAULT_DEPTH: usize = 8;

// =============================================================================
// Explanation Node
// =============================================================================

/// One fact in a support tree.
#[derive(Clone, Debug)]
pub struct ExplanationNode {
    /// The fact.
    pub fact: FactRef,
    /// Why the fact exists, or `None` for stated facts.
    pub justification: Option<Justification>,
    /// Explanations of the facts the justifying activation consumed.
    pub supports: Vec<ExplanationNode>,
    /// True if the fact is logical but the depth limit stopped the walk.
    pub truncated: bool,
}

impl ExplanationNode {
    /// Returns the fact's identity.
    #[must_use]
    pub fn id(&self) -> FactId {
        self.fact.id()
    }

    /// Returns true for stated facts.
    #[must_use]
    pub fn is_stated(&self) -> bool {
        self.justification.is_none()
    }

    /// Returns the rule that produced this fact, if it is logical.
    #[must_use]
    pub fn rule_id(&self) -> Option<&str> {
        self.justification.as_ref().map(|j| &*j.rule_id)
    }

    /// Returns the activation that produced this fact, if it is logical.
    #[must_use]
    pub fn activation(&self) -> Option<ActivationId> {
        self.justification.as_ref().map(|j| j.activation)
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ExplanationNode)) {
        visit(self);
        for support in &self.supports {
            support.walk(visit);
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(
            f,
            "{:indent$}{} {}",
            "",
            self.fact.kind(),
            self.fact.id(),
            indent = indent * 2
        )?;
        match &self.justification {
            Some(j) => write!(f, " <- {} ({})", j.rule_id, j.activation)?,
            None => write!(f, " (stated)")?,
        }
        if self.truncated {
            write!(f, " ...")?;
        }
        writeln!(f)?;
        for support in &self.supports {
            support.render(f, indent + 1)?;
        }
        Ok(())
    }
}

// =============================================================================
// Explanation
// =============================================================================

/// The support tree of a fact.
#[derive(Clone, Debug)]
pub struct Explanation {
    /// The fact being explained.
    pub root: ExplanationNode,
    /// Depth limit the tree was built with.
    pub max_depth: usize,
}

impl Explanation {
    /// Returns true if the explained fact is stated.
    #[must_use]
    pub fn is_stated(&self) -> bool {
        self.root.is_stated()
    }

    /// Returns true if any branch stopped at the depth limit.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        let mut truncated = false;
        self.root.walk(&mut |node| truncated |= node.truncated);
        truncated
    }

    /// Rules involved in the tree, in first-seen order.
    #[must_use]
    pub fn rules(&self) -> Vec<&str> {
        let mut rules: Vec<&str> = Vec::new();
        self.root.walk(&mut |node| {
            if let Some(rule) = node.rule_id() {
                if !rules.contains(&rule) {
                    rules.push(rule);
                }
            }
        });
        rules
    }

    /// Stated facts the tree ultimately rests on, in first-seen order.
    #[must_use]
    pub fn stated_roots(&self) -> Vec<FactId> {
        let mut roots = Vec::new();
        self.root.walk(&mut |node| {
            if node.is_stated() && !roots.contains(&node.id()) {
                roots.push(node.id());
            }
        });
        roots
    }

    /// Number of justification levels in the tree.
    #[must_use]
    pub fn depth(&self) -> usize {
        fn depth(node: &ExplanationNode) -> usize {
            if node.supports.is_empty() {
                usize::from(node.justification.is_some())
            } else {
                1 + node.supports.iter().map(depth).max().unwrap_or(0)
            }
        }
        depth(&self.root)
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.render(f, 0)
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Explains a fact, following up to [`DEFAULT_DEPTH`] levels of support.
///
/// Returns `None` if no fact with this id is in working memory.
#[must_use]
pub fn why(engine: &Engine, id: FactId) -> Option<Explanation> {
    why_with_depth(engine, id, DEFAULT_DEPTH)
}

/// Explains a fact, expanding at most `max_depth` justification levels.
///
/// With a depth of zero only the root is described.
#[must_use]
pub fn why_with_depth(engine: &Engine, id: FactId, max_depth: usize) -> Option<Explanation> {
    let root = explain_node(engine, id, max_depth)?;
    Some(Explanation { root, max_depth })
}

fn explain_node(engine: &Engine, id: FactId, remaining: usize) -> Option<ExplanationNode> {
    let fact = engine.fact(id)?.clone();
    let justification = engine.justification(id);

    let (supports, truncated) = match &justification {
        None => (Vec::new(), false),
        Some(_) if remaining == 0 => (Vec::new(), true),
        Some(j) => (
            j.consumed
                .iter()
                .filter_map(|&consumed| explain_node(engine, consumed, remaining - 1))
                .collect(),
            false,
        ),
    };

    Some(ExplanationNode {
        fact,
        justification,
        supports,
        truncated,
    })
}

// =============================================================================
// Tests
// =============================================================================
