//! Working memory: fact identity assignment and the kind index.
//!
//! The store owns every fact. Identities are allocated from a counter that
//! only moves forward, so a retracted identity never comes back.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use ember_foundation::{Error, ErrorKind, Fact, FactId, FactRef, KIND_FIELD, Record, Result, Value};

/// Identity of a rule firing, used to justify logical facts.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ActivationId(pub u64);

impl fmt::Debug for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActivationId({})", self.0)
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "activation {}", self.0)
    }
}

/// Truth-maintenance metadata stored next to a fact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FactMeta {
    /// True if the fact is justified by an activation and must disappear
    /// with it.
    pub logical: bool,
    /// The activation that produced a logical fact.
    pub produced_by: Option<ActivationId>,
}

impl FactMeta {
    /// Metadata for an ordinary (stated) fact.
    #[must_use]
    pub fn stated() -> Self {
        Self::default()
    }

    /// Metadata for a fact justified by `activation`.
    #[must_use]
    pub fn logical(activation: ActivationId) -> Self {
        Self {
            logical: true,
            produced_by: Some(activation),
        }
    }
}

/// A stored fact plus its metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct FactEntry {
    /// The canonical fact.
    pub fact: FactRef,
    /// Truth-maintenance metadata.
    pub meta: FactMeta,
}

impl FactEntry {
    /// Returns the fact's identity.
    #[must_use]
    pub fn id(&self) -> FactId {
        self.fact.id()
    }

    /// Returns true if `activation` is the logical justification of this fact.
    #[must_use]
    pub fn is_justified_by(&self, activation: ActivationId) -> bool {
        self.meta.logical && self.meta.produced_by == Some(activation)
    }
}

/// Indexed working memory.
#[derive(Clone, Debug)]
pub struct FactStore {
    facts: BTreeMap<FactId, FactEntry>,
    by_kind: HashMap<Arc<str>, BTreeSet<FactId>>,
    next_id: u64,
}

impl Default for FactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FactStore {
    /// Creates an empty store. The first assigned identity is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            facts: BTreeMap::new(),
            by_kind: HashMap::new(),
            next_id: 1,
        }
    }

    /// Stores a copy of `record` under a fresh identity.
    ///
    /// # Errors
    /// Returns [`ErrorKind::MissingKind`] if the record has no non-empty
    /// string `kind` field.
    pub fn assert(&mut self, record: &Record, meta: FactMeta) -> Result<FactEntry> {
        let kind: Arc<str> = match record.get(KIND_FIELD) {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            _ => return Err(Error::new(ErrorKind::MissingKind)),
        };

        let id = FactId(self.next_id);
        self.next_id += 1;

        let entry = FactEntry {
            fact: Arc::new(Fact::new(id, kind.clone(), record.clone())),
            meta,
        };
        self.facts.insert(id, entry.clone());
        self.by_kind.entry(kind).or_default().insert(id);
        Ok(entry)
    }

    /// Removes a fact, returning its entry if it existed.
    pub fn retract(&mut self, id: FactId) -> Option<FactEntry> {
        let entry = self.facts.remove(&id)?;
        let kind = entry.fact.kind();
        if let Some(ids) = self.by_kind.get_mut(kind) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_kind.remove(kind);
            }
        }
        Some(entry)
    }

    /// Returns the entry for an identity.
    #[must_use]
    pub fn entry(&self, id: FactId) -> Option<&FactEntry> {
        self.facts.get(&id)
    }

    /// Returns the fact for an identity.
    #[must_use]
    pub fn fact(&self, id: FactId) -> Option<&FactRef> {
        self.facts.get(&id).map(|e| &e.fact)
    }

    /// Returns true if the identity is currently stored.
    #[must_use]
    pub fn contains(&self, id: FactId) -> bool {
        self.facts.contains_key(&id)
    }

    /// Iterates facts of one kind in assertion order.
    ///
    /// Unknown kinds yield an empty sequence. Call again to restart.
    pub fn facts_of_kind<'a>(&'a self, kind: &str) -> impl Iterator<Item = &'a FactRef> + use<'a> {
        self.by_kind
            .get(kind)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.facts.get(id))
            .map(|entry| &entry.fact)
    }

    /// Iterates every stored entry in identity order.
    pub fn entries(&self) -> impl Iterator<Item = &FactEntry> {
        self.facts.values()
    }

    /// Returns the kinds that currently have at least one fact.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.by_kind.keys().map(AsRef::as_ref).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Returns the number of stored facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if no facts are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Drops every fact and restarts identity assignment at 1.
    pub fn clear(&mut self) {
        self.facts.clear();
        self.by_kind.clear();
        self.next_id = 1;
    }
}
