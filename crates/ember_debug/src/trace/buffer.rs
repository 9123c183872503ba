//! Ring buffer for trace records.
//!
//! Stores the most recent records up to a fixed size, discarding the oldest
//! when full.

use std::collections::{BTreeMap, VecDeque};

use ember_engine::EngineEvent;

use super::record::TraceRecord;

// =============================================================================
// Trace Buffer
// =============================================================================

/// A bounded buffer of trace records, oldest first.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    records: VecDeque<TraceRecord>,
    max_size: usize,
    next_id: u64,
    evicted: u64,
}

impl TraceBuffer {
    /// Creates a new trace buffer with the given maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
            next_id: 0,
            evicted: 0,
        }
    }

    /// Creates a buffer with the default size (10000 records).
    #[must_use]
    pub fn default_size() -> Self {
        Self::new(10_000)
    }

    /// Appends an event and returns the assigned record id.
    pub fn push(&mut self, sequence: u64, timestamp_ns: u64, event: EngineEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.records
            .push_back(TraceRecord::new(id, sequence, timestamp_ns, event));

        while self.records.len() > self.max_size {
            self.records.pop_front();
            self.evicted += 1;
        }

        id
    }

    /// Returns the number of records in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the maximum number of records kept.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Clears all records. Record ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Returns an iterator over all records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    /// Returns a record by id, if it is still buffered.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&TraceRecord> {
        let first = self.records.front()?.id;
        let index = usize::try_from(id.checked_sub(first)?).ok()?;
        self.records.get(index)
    }

    /// Returns the most recent `count` records, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<&TraceRecord> {
        let start = self.records.len().saturating_sub(count);
        self.records.iter().skip(start).collect()
    }

    /// Returns records matching a predicate.
    pub fn filter<F>(&self, predicate: F) -> Vec<&TraceRecord>
    where
        F: Fn(&TraceRecord) -> bool,
    {
        self.records.iter().filter(|r| predicate(r)).collect()
    }

    /// Returns records of one event name.
    #[must_use]
    pub fn by_event_name(&self, name: &str) -> Vec<&TraceRecord> {
        self.filter(|r| r.event_name() == name)
    }

    /// Returns records concerning one rule or query.
    #[must_use]
    pub fn by_source(&self, source: &str) -> Vec<&TraceRecord> {
        self.filter(|r| r.source() == Some(source))
    }

    /// Returns records that report failures.
    #[must_use]
    pub fn errors(&self) -> Vec<&TraceRecord> {
        self.filter(TraceRecord::is_error)
    }

    /// Returns statistics about the buffer.
    #[must_use]
    pub fn stats(&self) -> TraceBufferStats {
        let mut event_counts = BTreeMap::new();
        for record in &self.records {
            *event_counts.entry(record.event_name()).or_insert(0) += 1;
        }

        TraceBufferStats {
            record_count: self.records.len(),
            max_size: self.max_size,
            evicted: self.evicted,
            error_count: self.records.iter().filter(|r| r.is_error()).count(),
            oldest_sequence: self.records.front().map(|r| r.sequence),
            newest_sequence: self.records.back().map(|r| r.sequence),
            event_counts,
        }
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::default_size()
    }
}

// =============================================================================
// Buffer Statistics
// =============================================================================

/// Statistics about a trace buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceBufferStats {
    /// Number of records currently in buffer.
    pub record_count: usize,
    /// Maximum buffer size.
    pub max_size: usize,
    /// Records discarded because the buffer was full.
    pub evicted: u64,
    /// Buffered records that report failures.
    pub error_count: usize,
    /// Sequence number of the oldest buffered record.
    pub oldest_sequence: Option<u64>,
    /// Sequence number of the newest buffered record.
    pub newest_sequence: Option<u64>,
    /// Count of each event name.
    pub event_counts: BTreeMap<&'static str, usize>,
}

// =============================================================================
// Tests
// =============================================================================
