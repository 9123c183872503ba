//! Unification-style pattern matching.
//!
//! Patterns are matched against [`Value`]s and accumulate variable
//! [`Bindings`]. The matcher is a pure function: the same pattern, value and
//! incoming bindings always produce the same result.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ember_foundation::{KIND_FIELD, LtMap, Record, Result, Value};

/// Leading sigil of a variable reference (`?name`).
pub const VAR_SIGIL: char = '?';

/// Prefix that turns a variable inside a sequence pattern into a rest marker.
pub const REST_MARKER: &str = "...";

/// The wildcard marker.
pub const WILDCARD: &str = "_";

/// Returns true if `name` is a variable reference.
#[must_use]
pub fn is_variable(name: &str) -> bool {
    name.len() > 1 && name.starts_with(VAR_SIGIL)
}

fn variable_name(name: &str) -> Arc<str> {
    let name = name.strip_prefix(REST_MARKER).unwrap_or(name);
    if name.starts_with(VAR_SIGIL) {
        Arc::from(name)
    } else {
        Arc::from(format!("{VAR_SIGIL}{name}"))
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// A set of variable bindings from pattern matching.
///
/// Keys are full variable names including the sigil (`?total`). Alias
/// bindings are also stored under their plain name. Clones are O(1), so each
/// join branch carries its own copy.
#[derive(Clone, Default, PartialEq)]
pub struct Bindings {
    values: LtMap<Arc<str>, Value>,
}

impl Bindings {
    /// Create empty bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a binding by variable name.
    #[must_use]
    pub fn get(&self, var: &str) -> Option<&Value> {
        self.values.get(var)
    }

    /// Returns true if the variable is bound.
    #[must_use]
    pub fn contains(&self, var: &str) -> bool {
        self.values.contains_key(var)
    }

    /// Set a binding.
    pub fn set(&mut self, var: impl Into<Arc<str>>, value: Value) {
        self.values = self.values.insert(var.into(), value);
    }

    /// Returns a copy with an extra binding.
    #[must_use]
    pub fn with(mut self, var: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.set(var, value.into());
        self
    }

    /// Iterate all bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.values.iter()
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns every binding as a field map.
    #[must_use]
    pub fn to_record(&self) -> Record {
        self.values.clone()
    }

    /// Returns only the user variables: the kind discriminant and any
    /// binding holding a whole fact are dropped.
    #[must_use]
    pub fn user_variables(&self) -> Record {
        self.values
            .iter()
            .filter(|(k, v)| &***k != KIND_FIELD && !matches!(v, Value::Fact(_)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl<K: Into<Arc<str>>> FromIterator<(K, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// =============================================================================
// Pattern
// =============================================================================

/// Predicate used by [`Pattern::Predicate`]. An `Err` counts as a non-match.
pub type Predicate = Rc<dyn Fn(&Value) -> Result<bool>>;

/// A structural pattern.
#[derive(Clone)]
pub enum Pattern {
    /// Matches anything, binds nothing.
    Wildcard,
    /// Matches when the predicate returns `Ok(true)`.
    Predicate(Predicate),
    /// A variable reference, stored with its sigil.
    Var(Arc<str>),
    /// A rest marker inside a sequence pattern, stored as the variable name.
    Rest(Arc<str>),
    /// An ordered sequence, optionally with one rest marker.
    Seq(Vec<Pattern>),
    /// A keyed structure matched as a subset, fields in declaration order.
    Record(Vec<(Arc<str>, Pattern)>),
    /// Same-value equality.
    Exact(Value),
}

impl Pattern {
    /// A variable pattern. The sigil is added if missing.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::Var(variable_name(name))
    }

    /// A rest marker. Accepts `"mid"`, `"?mid"` or `"...?mid"`.
    #[must_use]
    pub fn rest(name: &str) -> Self {
        Self::Rest(variable_name(name))
    }

    /// An exact value pattern.
    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact(value.into())
    }

    /// A sequence pattern.
    #[must_use]
    pub fn seq(items: impl IntoIterator<Item = Pattern>) -> Self {
        Self::Seq(items.into_iter().collect())
    }

    /// A keyed-structure pattern.
    #[must_use]
    pub fn record<K, P, I>(fields: I) -> Self
    where
        K: Into<Arc<str>>,
        P: Into<Pattern>,
        I: IntoIterator<Item = (K, P)>,
    {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, p)| (k.into(), p.into()))
                .collect(),
        )
    }

    /// A predicate pattern.
    #[must_use]
    pub fn predicate(f: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::Predicate(Rc::new(move |v: &Value| Ok(f(v))))
    }

    /// A fallible predicate pattern. Errors count as non-match.
    #[must_use]
    pub fn try_predicate(f: impl Fn(&Value) -> Result<bool> + 'static) -> Self {
        Self::Predicate(Rc::new(f))
    }

    /// Builds a pattern from plain data.
    ///
    /// `"_"` is the wildcard, `"?x"` a variable, `"...?x"` inside a sequence
    /// a rest marker; sequences and keyed structures become structural
    /// patterns; everything else is matched exactly.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) if &**s == WILDCARD => Self::Wildcard,
            Value::String(s) if is_variable(s) => Self::Var(s.clone()),
            Value::Vec(items) => Self::Seq(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s)
                            if s.strip_prefix(REST_MARKER).is_some_and(is_variable) =>
                        {
                            Self::rest(s)
                        }
                        other => Self::from_value(other),
                    })
                    .collect(),
            ),
            Value::Map(fields) => Self::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_value(v)))
                    .collect(),
            ),
            other => Self::Exact(other.clone()),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "_"),
            Self::Predicate(_) => write!(f, "<predicate>"),
            Self::Var(name) => write!(f, "{name}"),
            Self::Rest(name) => write!(f, "{REST_MARKER}{name}"),
            Self::Seq(items) => f.debug_list().entries(items).finish(),
            Self::Record(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k, v)))
                .finish(),
            Self::Exact(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::from_value(&Value::from(s))
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::from_value(&Value::from(s))
    }
}

impl From<i32> for Pattern {
    fn from(n: i32) -> Self {
        Self::Exact(Value::from(n))
    }
}

impl From<f64> for Pattern {
    fn from(n: f64) -> Self {
        Self::Exact(Value::from(n))
    }
}

impl From<bool> for Pattern {
    fn from(b: bool) -> Self {
        Self::Exact(Value::from(b))
    }
}

// =============================================================================
// Matching
// =============================================================================

/// Outcome of [`match_pattern`].
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    /// Whether the value matched.
    pub is_match: bool,
    /// Bindings after the attempt. On failure these hold whatever was bound
    /// before the failing step.
    pub bindings: Bindings,
}

/// Matches `value` against `pattern`, extending `bindings`.
#[must_use]
pub fn match_pattern(pattern: &Pattern, value: &Value, bindings: &Bindings) -> MatchResult {
    let mut bindings = bindings.clone();
    let is_match = unify(pattern, value, &mut bindings);
    MatchResult { is_match, bindings }
}

fn unify(pattern: &Pattern, value: &Value, bindings: &mut Bindings) -> bool {
    match pattern {
        Pattern::Wildcard => true,
        Pattern::Predicate(predicate) => predicate(value).unwrap_or(false),
        Pattern::Var(name) => unify_var(name, value, bindings),
        // A rest marker only has meaning inside a sequence.
        Pattern::Rest(_) => false,
        Pattern::Seq(items) => unify_seq(items, value, bindings),
        Pattern::Record(fields) => unify_record(fields, value, bindings),
        Pattern::Exact(expected) => expected == value,
    }
}

fn unify_var(name: &Arc<str>, value: &Value, bindings: &mut Bindings) -> bool {
    // A bound value is itself read as a pattern, so variables and wildcards
    // nested inside bound data still apply. Chains of bare variables are
    // followed until they leave the chain; a cycle compares literally.
    let mut seen = vec![name.clone()];
    let mut current = name.clone();
    loop {
        let Some(bound) = bindings.get(&current).cloned() else {
            bindings.set(current, value.clone());
            return true;
        };
        match Pattern::from_value(&bound) {
            Pattern::Var(next) if seen.contains(&next) => return bound == *value,
            Pattern::Var(next) => {
                seen.push(next.clone());
                current = next;
            }
            pattern => return unify(&pattern, value, bindings),
        }
    }
}

fn unify_seq(items: &[Pattern], value: &Value, bindings: &mut Bindings) -> bool {
    let Some(seq) = value.as_vec() else {
        return false;
    };

    let rests: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, p)| matches!(p, Pattern::Rest(_)))
        .map(|(i, _)| i)
        .collect();

    match rests.as_slice() {
        [] => {
            seq.len() == items.len()
                && items
                    .iter()
                    .zip(seq.iter())
                    .all(|(p, v)| unify(p, v, bindings))
        }
        [split] => {
            let head = &items[..*split];
            let tail = &items[split + 1..];
            if seq.len() < head.len() + tail.len() {
                return false;
            }
            let tail_start = seq.len() - tail.len();

            if !head
                .iter()
                .zip(seq.iter())
                .all(|(p, v)| unify(p, v, bindings))
            {
                return false;
            }

            if let Pattern::Rest(name) = &items[*split] {
                let middle = Value::Vec(seq.slice(head.len(), tail_start));
                if !unify_var(name, &middle, bindings) {
                    return false;
                }
            }

            tail.iter()
                .zip(seq.iter().skip(tail_start))
                .all(|(p, v)| unify(p, v, bindings))
        }
        // More than one rest marker is ambiguous.
        _ => false,
    }
}

fn unify_record(fields: &[(Arc<str>, Pattern)], value: &Value, bindings: &mut Bindings) -> bool {
    let Some(map) = value.as_map() else {
        return false;
    };
    fields.iter().all(|(name, pattern)| {
        map.get(&**name)
            .is_some_and(|field| unify(pattern, field, bindings))
    })
}
