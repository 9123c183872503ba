//! Read-only queries over the fact store.
//!
//! A query joins its conditions like a rule does, then shapes the matches:
//! projection (or the raw user variables), `distinct`, a stable sort, and
//! finally `offset` and `limit`.

use std::cmp::Ordering;
use std::sync::Arc;

use ember_foundation::{Record, Value};

use crate::condition::Condition;
use crate::expr::Expr;

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// A named query definition.
#[derive(Clone, Debug)]
pub struct Query {
    /// Query identity.
    pub id: Arc<str>,
    /// Conditions joined left to right.
    pub when: Vec<Condition>,
    /// Output fields, each computed from the match bindings.
    pub projection: Option<Vec<(Arc<str>, Expr)>>,
    /// Drop duplicate rows.
    pub distinct: bool,
    /// Sort key and direction.
    pub order_by: Option<(Arc<str>, Order)>,
    /// Rows skipped from the front.
    pub offset: usize,
    /// Maximum rows returned. Zero means unlimited.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a query with no conditions.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: Arc::from(id),
            when: Vec::new(),
            projection: None,
            distinct: false,
            order_by: None,
            offset: 0,
            limit: None,
        }
    }

    /// Appends a condition.
    #[must_use]
    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.when.push(condition.into());
        self
    }

    /// Adds an output field.
    #[must_use]
    pub fn project(mut self, field: &str, expr: impl Into<Expr>) -> Self {
        self.projection
            .get_or_insert_with(Vec::new)
            .push((Arc::from(field), expr.into()));
        self
    }

    /// Removes duplicate rows.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Sorts rows by a field.
    #[must_use]
    pub fn order_by(mut self, key: &str, order: Order) -> Self {
        self.order_by = Some((Arc::from(key), order));
        self
    }

    /// Skips rows.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Caps the row count.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true when the first match is also the first row, so matching
    /// may stop early.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        !self.distinct && self.order_by.is_none() && self.offset == 0
    }

    /// Applies `distinct`, ordering and paging to already projected rows.
    #[must_use]
    pub fn shape(&self, mut rows: Vec<Record>) -> Vec<Record> {
        if self.distinct {
            let mut unique: Vec<Record> = Vec::with_capacity(rows.len());
            for row in rows {
                if !unique.contains(&row) {
                    unique.push(row);
                }
            }
            rows = unique;
        }

        if let Some((key, order)) = &self.order_by {
            rows.sort_by(|a, b| compare_rows(a, b, key, *order));
        }

        let limit = self.limit.filter(|&n| n > 0).unwrap_or(usize::MAX);
        rows.into_iter().skip(self.offset).take(limit).collect()
    }
}

// =============================================================================
// Ordering
// =============================================================================

fn sort_value<'r>(row: &'r Record, key: &str) -> Option<&'r Value> {
    let value = row
        .get(key)
        .or_else(|| row.get(format!("?{key}").as_str()))?;
    (!value.is_undefined()).then_some(value)
}

// Undefined sorts last in either direction.
fn compare_rows(a: &Record, b: &Record, key: &str, order: Order) -> Ordering {
    match (sort_value(a, key), sort_value(b, key)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = total_cmp(x, y);
            match order {
                Order::Asc => ord,
                Order::Desc => ord.reverse(),
            }
        }
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Undefined => 0,
        Value::Null => 1,
        Value::Bool(_) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Date(_) => 5,
        Value::Vec(_) => 6,
        Value::Map(_) => 7,
        Value::Fact(_) => 8,
    }
}

// A total order: values of different types order by type, composites of
// the same type compare equal.
fn total_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Fact(x), Value::Fact(y)) => x.id().cmp(&y.id()),
        _ => rank(a).cmp(&rank(b)),
    }
}
