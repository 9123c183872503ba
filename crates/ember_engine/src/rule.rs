//! Production rules and their lifecycle hooks.
//!
//! A rule fires its action when its conditions jointly match and its `pre`
//! guards pass. Around the action sit optional hooks:
//!
//! - `around` wraps the action and decides when to `proceed`
//! - `throws` handlers catch action errors by kind name
//! - `post` conditions are re-checked after the action
//! - `after` always runs last, whatever the outcome

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ember_foundation::{Error, Result};

use crate::condition::Condition;
use crate::engine::ActionContext;
use crate::expr::Expr;

/// The rule body.
pub type Action = Rc<dyn Fn(&mut ActionContext<'_>) -> Result<()>>;

/// Continuation handed to an `around` hook.
pub type Proceed<'p> = &'p mut dyn FnMut(&mut ActionContext<'_>) -> Result<()>;

/// Wraps the action; must call `proceed` for the action to run.
pub type AroundHook = Rc<dyn Fn(&mut ActionContext<'_>, Proceed<'_>) -> Result<()>>;

/// Runs after execution with the error, if any.
pub type AfterHook = Rc<dyn Fn(&mut ActionContext<'_>, Option<&Error>) -> Result<()>>;

/// Handles an action error of a particular kind.
pub type ErrorHandler = Rc<dyn Fn(&mut ActionContext<'_>, &Error) -> Result<()>>;

/// Which rule steps are logged at `info` level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuleLog {
    /// Log each firing.
    pub fired: bool,
    /// Include the bindings in the firing log line.
    pub bindings: bool,
}

impl RuleLog {
    /// Log firings with bindings.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            fired: true,
            bindings: true,
        }
    }
}

// =============================================================================
// Rule
// =============================================================================

/// A production rule.
#[derive(Clone)]
pub struct Rule {
    /// Rule identity.
    pub id: Arc<str>,
    /// Priority (higher fires first).
    pub salience: i32,
    /// Conditions joined left to right.
    pub when: Vec<Condition>,
    /// Guards checked once an activation is selected.
    pub pre: Vec<Expr>,
    /// The action.
    pub action: Action,
    /// Optional wrapper around the action.
    pub around: Option<AroundHook>,
    /// Optional hook that always runs last.
    pub after: Option<AfterHook>,
    /// Conditions re-checked after the action.
    pub post: Vec<Condition>,
    /// Error handlers keyed by error kind name.
    pub throws: Vec<(Arc<str>, ErrorHandler)>,
    /// Logging flags.
    pub log: RuleLog,
}

impl Rule {
    /// Creates a rule with no conditions.
    #[must_use]
    pub fn new(id: &str, action: impl Fn(&mut ActionContext<'_>) -> Result<()> + 'static) -> Self {
        Self {
            id: Arc::from(id),
            salience: 0,
            when: Vec::new(),
            pre: Vec::new(),
            action: Rc::new(action),
            around: None,
            after: None,
            post: Vec::new(),
            throws: Vec::new(),
            log: RuleLog::default(),
        }
    }

    /// Sets the salience (priority).
    #[must_use]
    pub fn with_salience(mut self, salience: i32) -> Self {
        self.salience = salience;
        self
    }

    /// Appends a condition.
    #[must_use]
    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.when.push(condition.into());
        self
    }

    /// Appends a pre-condition guard.
    #[must_use]
    pub fn pre(mut self, guard: Expr) -> Self {
        self.pre.push(guard);
        self
    }

    /// Appends a post-condition.
    #[must_use]
    pub fn post(mut self, condition: impl Into<Condition>) -> Self {
        self.post.push(condition.into());
        self
    }

    /// Sets the `around` hook.
    #[must_use]
    pub fn with_around(
        mut self,
        hook: impl Fn(&mut ActionContext<'_>, Proceed<'_>) -> Result<()> + 'static,
    ) -> Self {
        self.around = Some(Rc::new(hook));
        self
    }

    /// Sets the `after` hook.
    #[must_use]
    pub fn with_after(
        mut self,
        hook: impl Fn(&mut ActionContext<'_>, Option<&Error>) -> Result<()> + 'static,
    ) -> Self {
        self.after = Some(Rc::new(hook));
        self
    }

    /// Adds an error handler for errors whose kind name is `kind`.
    #[must_use]
    pub fn throws(
        mut self,
        kind: &str,
        handler: impl Fn(&mut ActionContext<'_>, &Error) -> Result<()> + 'static,
    ) -> Self {
        self.throws.push((Arc::from(kind), Rc::new(handler)));
        self
    }

    /// Sets the logging flags.
    #[must_use]
    pub fn with_log(mut self, log: RuleLog) -> Self {
        self.log = log;
        self
    }

    /// Returns the handler registered for an error kind.
    #[must_use]
    pub fn handler(&self, kind: &str) -> Option<&ErrorHandler> {
        self.throws
            .iter()
            .find(|(k, _)| &**k == kind)
            .map(|(_, h)| h)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("salience", &self.salience)
            .field("when", &self.when)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .field("around", &self.around.is_some())
            .field("after", &self.after.is_some())
            .field(
                "throws",
                &self.throws.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
