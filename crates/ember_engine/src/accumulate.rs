//! Aggregations over matched facts.
//!
//! An [`Accumulator`] pairs an operator with an optional source field and is
//! applied to every fact that matched an accumulate condition. Operators are
//! pure; invalid inputs are skipped rather than reported.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ember_foundation::{FactRef, Value};

/// A user-supplied aggregation.
pub type CustomAccumulator = Rc<dyn Fn(&[FactRef]) -> Value>;

/// The aggregation operator.
#[derive(Clone)]
pub enum AccumulatorOp {
    /// Number of facts.
    Count,
    /// Numeric sum; booleans count as 1/0.
    Sum,
    /// Numeric mean; 0 when nothing is valid.
    Average,
    /// Smallest number; `+Infinity` when nothing is valid.
    MinNumber,
    /// Largest number; `-Infinity` when nothing is valid.
    MaxNumber,
    /// Earliest date; null when nothing is valid.
    MinDate,
    /// Latest date; null when nothing is valid.
    MaxDate,
    /// Lexicographically smallest plain string; undefined when none.
    MinString,
    /// Lexicographically largest plain string; undefined when none.
    MaxString,
    /// `false` if any boolean is false; null when none.
    MinBoolean,
    /// `true` if any boolean is true; null when none.
    MaxBoolean,
    /// Every projected value, missing ones included.
    Collect,
    /// Unique projected values in first-seen order.
    DistinctCollect,
    /// A named custom aggregation over the matched facts.
    Custom(Arc<str>, CustomAccumulator),
}

impl AccumulatorOp {
    /// Returns the operator name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Average => "average",
            Self::MinNumber => "minNumber",
            Self::MaxNumber => "maxNumber",
            Self::MinDate => "minDate",
            Self::MaxDate => "maxDate",
            Self::MinString => "minString",
            Self::MaxString => "maxString",
            Self::MinBoolean => "minBoolean",
            Self::MaxBoolean => "maxBoolean",
            Self::Collect => "collect",
            Self::DistinctCollect => "distinctCollect",
            Self::Custom(name, _) => name,
        }
    }
}

impl fmt::Debug for AccumulatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An operator plus the field it reads.
#[derive(Clone, Debug)]
pub struct Accumulator {
    /// The aggregation operator.
    pub op: AccumulatorOp,
    /// Field read from each fact. `None` aggregates the facts themselves.
    pub field: Option<Arc<str>>,
}

impl Accumulator {
    fn on(op: AccumulatorOp, field: &str) -> Self {
        Self {
            op,
            field: Some(Arc::from(field)),
        }
    }

    /// Counts matched facts.
    #[must_use]
    pub fn count() -> Self {
        Self {
            op: AccumulatorOp::Count,
            field: None,
        }
    }

    /// Sums a numeric field.
    #[must_use]
    pub fn sum(field: &str) -> Self {
        Self::on(AccumulatorOp::Sum, field)
    }

    /// Averages a numeric field.
    #[must_use]
    pub fn average(field: &str) -> Self {
        Self::on(AccumulatorOp::Average, field)
    }

    /// Smallest number in a field.
    #[must_use]
    pub fn min_number(field: &str) -> Self {
        Self::on(AccumulatorOp::MinNumber, field)
    }

    /// Largest number in a field.
    #[must_use]
    pub fn max_number(field: &str) -> Self {
        Self::on(AccumulatorOp::MaxNumber, field)
    }

    /// Earliest date in a field.
    #[must_use]
    pub fn min_date(field: &str) -> Self {
        Self::on(AccumulatorOp::MinDate, field)
    }

    /// Latest date in a field.
    #[must_use]
    pub fn max_date(field: &str) -> Self {
        Self::on(AccumulatorOp::MaxDate, field)
    }

    /// Smallest plain string in a field.
    #[must_use]
    pub fn min_string(field: &str) -> Self {
        Self::on(AccumulatorOp::MinString, field)
    }

    /// Largest plain string in a field.
    #[must_use]
    pub fn max_string(field: &str) -> Self {
        Self::on(AccumulatorOp::MaxString, field)
    }

    /// Smallest boolean in a field.
    #[must_use]
    pub fn min_boolean(field: &str) -> Self {
        Self::on(AccumulatorOp::MinBoolean, field)
    }

    /// Largest boolean in a field.
    #[must_use]
    pub fn max_boolean(field: &str) -> Self {
        Self::on(AccumulatorOp::MaxBoolean, field)
    }

    /// Collects a field from every fact.
    #[must_use]
    pub fn collect(field: &str) -> Self {
        Self::on(AccumulatorOp::Collect, field)
    }

    /// Collects the distinct values of a field.
    #[must_use]
    pub fn distinct_collect(field: &str) -> Self {
        Self::on(AccumulatorOp::DistinctCollect, field)
    }

    /// A custom aggregation over the matched facts.
    #[must_use]
    pub fn custom(name: &str, f: impl Fn(&[FactRef]) -> Value + 'static) -> Self {
        Self {
            op: AccumulatorOp::Custom(Arc::from(name), Rc::new(f)),
            field: None,
        }
    }

    /// Runs the aggregation.
    #[must_use]
    pub fn apply(&self, facts: &[FactRef]) -> Value {
        let values = || facts.iter().map(|f| self.project(f));

        match &self.op {
            AccumulatorOp::Count => Value::from(facts.len()),
            AccumulatorOp::Sum => Value::Number(sum(values().filter_map(|v| v.as_numeric()))),
            AccumulatorOp::Average => {
                let nums: Vec<f64> = values().filter_map(|v| v.as_numeric()).collect();
                if nums.is_empty() {
                    Value::Number(0.0)
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let n = nums.len() as f64;
                    Value::Number(sum(nums.iter().copied()) / n)
                }
            }
            AccumulatorOp::MinNumber => Value::Number(
                values()
                    .filter_map(|v| v.as_number())
                    .fold(f64::INFINITY, f64::min),
            ),
            AccumulatorOp::MaxNumber => Value::Number(
                values()
                    .filter_map(|v| v.as_number())
                    .fold(f64::NEG_INFINITY, f64::max),
            ),
            AccumulatorOp::MinDate => values()
                .filter_map(|v| as_date(&v))
                .min()
                .map_or(Value::Null, Value::Date),
            AccumulatorOp::MaxDate => values()
                .filter_map(|v| as_date(&v))
                .max()
                .map_or(Value::Null, Value::Date),
            AccumulatorOp::MinString => plain_strings(values())
                .min()
                .map_or(Value::Undefined, Value::String),
            AccumulatorOp::MaxString => plain_strings(values())
                .max()
                .map_or(Value::Undefined, Value::String),
            AccumulatorOp::MinBoolean => values()
                .filter_map(|v| v.as_bool())
                .min()
                .map_or(Value::Null, Value::Bool),
            AccumulatorOp::MaxBoolean => values()
                .filter_map(|v| v.as_bool())
                .max()
                .map_or(Value::Null, Value::Bool),
            AccumulatorOp::Collect => Value::Vec(values().collect()),
            AccumulatorOp::DistinctCollect => {
                let mut seen: Vec<Value> = Vec::new();
                for v in values() {
                    if !seen.contains(&v) {
                        seen.push(v);
                    }
                }
                Value::list(seen)
            }
            AccumulatorOp::Custom(_, f) => f(facts),
        }
    }

    fn project(&self, fact: &FactRef) -> Value {
        match &self.field {
            Some(field) => fact.get(field).cloned().unwrap_or(Value::Undefined),
            None => Value::Fact(fact.clone()),
        }
    }
}

// Float `Sum` starts from -0.0; an empty sum must be +0.
fn sum(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |acc, n| acc + n)
}

// =============================================================================
// Value sniffing
// =============================================================================

/// Returns true if the string would read as a number (`"12"`, `" 1e3 "`,
/// `"Infinity"`).
fn looks_numeric(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    if matches!(s, "Infinity" | "+Infinity" | "-Infinity") {
        return true;
    }
    s.parse::<f64>().is_ok_and(f64::is_finite)
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%a %B %d %Y",
    "%a, %d %B %Y",
];

/// Reads a date string in any of the common layouts. Times without a zone
/// are taken as UTC.
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
    {
        return Some(naive.and_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Accepts dates, date strings, and millisecond timestamps.
fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(d) => Some(*d),
        Value::String(s) => parse_date(s),
        #[allow(clippy::cast_possible_truncation)]
        Value::Number(ms) if ms.is_finite() => DateTime::from_timestamp_millis(*ms as i64),
        _ => None,
    }
}

fn plain_strings(values: impl Iterator<Item = Value>) -> impl Iterator<Item = Arc<str>> {
    values.filter_map(|v| match v {
        Value::String(s) if !looks_numeric(&s) && parse_date(&s).is_none() => Some(s),
        _ => None,
    })
}
