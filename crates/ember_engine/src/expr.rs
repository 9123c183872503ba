//! Guard and projection expressions.
//!
//! Expressions are prefix S-expressions: an operator name followed by
//! operands. Operands are variable references, literals, or nested
//! expressions. They can be built directly or parsed from data such as
//! `["<", "?total", 100]`.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ember_foundation::{Error, ErrorKind, Result, Value};

use crate::pattern::{Bindings, is_variable};

/// A size matcher used by `hasSize`.
pub type SizeMatcher = Rc<dyn Fn(&Value) -> bool>;

/// An expression node.
#[derive(Clone)]
pub enum Expr {
    /// Variable reference, stored with its sigil.
    Var(Arc<str>),
    /// Literal value.
    Lit(Value),
    /// Operator application.
    Call(Arc<str>, Vec<Expr>),
    /// Predicate operand, only meaningful as the matcher of `hasSize`.
    Matcher(SizeMatcher),
}

impl Expr {
    /// A variable reference. The sigil is added if missing.
    #[must_use]
    pub fn var(name: &str) -> Self {
        if name.starts_with('?') {
            Self::Var(Arc::from(name))
        } else {
            Self::Var(Arc::from(format!("?{name}")))
        }
    }

    /// A literal.
    #[must_use]
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Lit(value.into())
    }

    /// An operator application.
    #[must_use]
    pub fn call(op: &str, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::Call(Arc::from(op), args.into_iter().collect())
    }

    /// A predicate matcher for `hasSize`.
    #[must_use]
    pub fn matcher(f: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::Matcher(Rc::new(f))
    }

    /// Parses an expression from data.
    ///
    /// The top level must be a sequence whose first element is an operator
    /// name. Nested sequences are parsed as expressions, `"?x"` strings as
    /// variables, everything else as literals.
    ///
    /// # Errors
    /// Returns a guard error if the data is not a well-formed expression.
    pub fn parse(value: &Value) -> Result<Self> {
        let malformed = || Error::guard(format!("guard not a well-formed expression: {value:?}"));
        let items = value.as_vec().ok_or_else(malformed)?;
        let op = items.first().and_then(Value::as_str).ok_or_else(malformed)?;
        let args = items
            .iter()
            .skip(1)
            .map(Self::parse_operand)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Call(Arc::from(op), args))
    }

    fn parse_operand(value: &Value) -> Result<Self> {
        match value {
            Value::Vec(_) => Self::parse(value),
            Value::String(s) if is_variable(s) => Ok(Self::Var(s.clone())),
            other => Ok(Self::Lit(other.clone())),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => write!(f, "{name}"),
            Self::Lit(Value::String(s)) => write!(f, "{s:?}"),
            Self::Lit(v) => write!(f, "{v:?}"),
            Self::Call(op, args) => {
                write!(f, "({op}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
            Self::Matcher(_) => write!(f, "<matcher>"),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        if is_variable(s) {
            Self::Var(Arc::from(s))
        } else {
            Self::Lit(Value::from(s))
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Self::Lit(v)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Self::Lit(Value::from(n))
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Self::Lit(Value::from(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Self::Lit(Value::from(b))
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates an expression. Unbound variables are errors.
///
/// # Errors
/// Returns a guard error for unknown operators, bad arity, non-numeric
/// operands, division by zero, or unbound variables.
pub fn evaluate(expr: &Expr, bindings: &Bindings) -> Result<Value> {
    Evaluator {
        bindings,
        allow_unbound: false,
    }
    .eval(expr)
}

/// Evaluates an expression, resolving unbound variables to undefined.
///
/// # Errors
/// Same as [`evaluate`], except for unbound variables.
pub fn evaluate_lenient(expr: &Expr, bindings: &Bindings) -> Result<Value> {
    Evaluator {
        bindings,
        allow_unbound: true,
    }
    .eval(expr)
}

struct Evaluator<'a> {
    bindings: &'a Bindings,
    allow_unbound: bool,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Var(name) => match self.bindings.get(name) {
                Some(v) => Ok(v.clone()),
                None if self.allow_unbound => Ok(Value::Undefined),
                None => Err(Error::unbound(&**name)),
            },
            Expr::Lit(v) => Ok(v.clone()),
            Expr::Call(op, args) => self.call(op, args),
            Expr::Matcher(_) => Err(Error::guard("matcher used outside hasSize")),
        }
    }

    fn operands(&self, args: &[Expr]) -> Result<Vec<Value>> {
        args.iter().map(|a| self.eval(a)).collect()
    }

    fn call(&self, op: &str, args: &[Expr]) -> Result<Value> {
        match op {
            ">" | ">=" | "<" | "<=" => {
                let [a, b] = self.exactly::<2>(op, args)?;
                let (a, b) = (numeric(op, &a)?, numeric(op, &b)?);
                Ok(Value::Bool(match op {
                    ">" => a > b,
                    ">=" => a >= b,
                    "<" => a < b,
                    _ => a <= b,
                }))
            }
            "===" => {
                let [a, b] = self.exactly::<2>(op, args)?;
                Ok(Value::Bool(a.strict_eq(&b)))
            }
            "!==" => {
                let [a, b] = self.exactly::<2>(op, args)?;
                Ok(Value::Bool(!a.strict_eq(&b)))
            }
            "+" => {
                let values = self.operands(args)?;
                if values.iter().any(|v| matches!(v, Value::String(_))) {
                    Ok(Value::from(values.iter().map(ToString::to_string).collect::<String>()))
                } else {
                    let mut total = 0.0;
                    for v in &values {
                        total += numeric(op, v)?;
                    }
                    Ok(Value::Number(total))
                }
            }
            "-" => {
                let values = self.operands(args)?;
                match values.as_slice() {
                    [] => Err(arity(op, "at least 1", 0)),
                    [only] => Ok(Value::Number(-numeric(op, only)?)),
                    [first, rest @ ..] => {
                        let mut acc = numeric(op, first)?;
                        for v in rest {
                            acc -= numeric(op, v)?;
                        }
                        Ok(Value::Number(acc))
                    }
                }
            }
            "*" => {
                let mut product = 1.0;
                for v in &self.operands(args)? {
                    product *= numeric(op, v)?;
                }
                Ok(Value::Number(product))
            }
            "/" => {
                let [a, b] = self.exactly::<2>(op, args)?;
                let (a, b) = (numeric(op, &a)?, numeric(op, &b)?);
                if b == 0.0 {
                    return Err(Error::new(ErrorKind::DivisionByZero));
                }
                Ok(Value::Number(a / b))
            }
            "path" => {
                let Some((target, keys)) = args.split_first() else {
                    return Err(arity(op, "at least 1", 0));
                };
                self.walk(self.eval(target)?, keys)
            }
            "pathOr" => {
                let [default, target, keys @ ..] = args else {
                    return Err(arity(op, "at least 2", args.len()));
                };
                let found = self.walk(self.eval(target)?, keys)?;
                if found.is_undefined() {
                    self.eval(default)
                } else {
                    Ok(found)
                }
            }
            "isNil" => {
                let [v] = self.exactly::<1>(op, args)?;
                Ok(Value::Bool(v.is_nil()))
            }
            "isDefined" => {
                let [v] = self.exactly::<1>(op, args)?;
                Ok(Value::Bool(!v.is_nil()))
            }
            "hasSize" => {
                let [target, matcher] = args else {
                    return Err(arity(op, "2", args.len()));
                };
                let Some(size) = self.eval(target)?.size() else {
                    return Ok(Value::Bool(false));
                };
                let size = Value::from(size);
                match matcher {
                    Expr::Matcher(f) => Ok(Value::Bool(f(&size))),
                    other => match self.eval(other)? {
                        expected @ Value::Number(_) => Ok(Value::Bool(size.strict_eq(&expected))),
                        _ => Err(Error::guard("hasSize expects a number or matcher")),
                    },
                }
            }
            unknown => Err(Error::guard(format!("unknown operator '{unknown}'"))),
        }
    }

    fn exactly<const N: usize>(&self, op: &str, args: &[Expr]) -> Result<[Value; N]> {
        if args.len() != N {
            return Err(arity(op, &N.to_string(), args.len()));
        }
        let values = self.operands(args)?;
        values
            .try_into()
            .map_err(|_| Error::new(ErrorKind::Internal("operand count changed".into())))
    }

    // Walks through keyed structures and sequences. Anything that cannot be
    // indexed ends the walk with undefined.
    fn walk(&self, mut current: Value, keys: &[Expr]) -> Result<Value> {
        for key in keys {
            let key = self.eval(key)?;
            let next = match (&current, &key) {
                (Value::Map(_) | Value::Fact(_), Value::String(name)) => current.field(name).cloned(),
                (Value::Vec(items), Value::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let index = *n as usize;
                    items.get(index).cloned()
                }
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return Ok(Value::Undefined),
            }
        }
        Ok(current)
    }
}

fn numeric(op: &str, value: &Value) -> Result<f64> {
    value.as_numeric().ok_or_else(|| {
        Error::guard(format!(
            "'{op}' expects numeric operands, got {}",
            value.type_name()
        ))
    })
}

fn arity(op: &str, expected: &str, got: usize) -> Error {
    Error::guard(format!("'{op}' expects {expected} operands, got {got}"))
}
