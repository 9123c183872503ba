//! Fact identities and immutable fact records.

use std::fmt;
use std::sync::Arc;

use crate::value::{Record, Value};

/// Name of the mandatory discriminant field carried by every fact.
pub const KIND_FIELD: &str = "kind";

/// Engine-assigned fact identity.
///
/// Identities are positive, strictly increasing for the lifetime of a store,
/// and never reused after a retraction.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactId(pub u64);

impl FactId {
    /// Returns the raw identity number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactId({})", self.0)
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to a stored fact.
pub type FactRef = Arc<Fact>;

/// An immutable, typed working-memory record.
///
/// The field map always contains a non-empty string under [`KIND_FIELD`];
/// the store guarantees this before a `Fact` is ever constructed.
#[derive(Clone, PartialEq)]
pub struct Fact {
    id: FactId,
    kind: Arc<str>,
    fields: Record,
}

impl Fact {
    /// Creates a fact from an identity, discriminant and field map.
    ///
    /// The discriminant is written into the field map so that keyed patterns
    /// can match on it like any other field.
    #[must_use]
    pub fn new(id: FactId, kind: Arc<str>, fields: Record) -> Self {
        let fields = fields.insert(Arc::from(KIND_FIELD), Value::String(kind.clone()));
        Self { id, kind, fields }
    }

    /// Returns the fact's identity.
    #[must_use]
    pub const fn id(&self) -> FactId {
        self.id
    }

    /// Returns the fact's type discriminant.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns all fields, including the discriminant.
    #[must_use]
    pub fn fields(&self) -> &Record {
        &self.fields
    }

    /// Reads a single field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {:?}", self.kind, self.id, self.fields)
    }
}
