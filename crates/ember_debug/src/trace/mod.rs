//! Tracing of engine events.
//!
//! A [`Tracer`] subscribes to an engine's notifier and keeps the most recent
//! events in a bounded [`TraceBuffer`]. It costs one branch per event while
//! disabled.
//!
//! # Example
//!
//! ```text
//! let tracer = Tracer::new(TracerConfig::new().enabled());
//! tracer.attach(engine.notifier());
//! engine.run()?;
//! println!("{}", tracer.dump());
//! ```

pub mod buffer;
pub mod format;
pub mod record;

pub use buffer::{TraceBuffer, TraceBufferStats};
pub use format::{HumanFormatter, JsonFormatter, TraceFormatter};
pub use record::TraceRecord;

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::{Rc, Weak};
use std::time::Instant;

use ember_engine::{EngineEvent, ListenerId, Notifier};

// =============================================================================
// Trace Output
// =============================================================================

/// Where trace lines are written as events arrive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceOutput {
    /// No output (records are still buffered).
    #[default]
    None,
    /// Write each record to stderr.
    Stderr,
}

// =============================================================================
// Tracer Configuration
// =============================================================================

/// Configuration for the tracer.
#[derive(Clone, Debug)]
pub struct TracerConfig {
    /// Whether tracing is enabled.
    pub enabled: bool,
    /// Maximum records to keep in buffer.
    pub buffer_size: usize,
    /// Where to output traces.
    pub output: TraceOutput,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Event names to keep (empty keeps all).
    pub event_filter: Vec<String>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer_size: 10_000,
            output: TraceOutput::None,
            json_format: false,
            event_filter: Vec::new(),
        }
    }
}

impl TracerConfig {
    /// Creates a new tracer configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to enable tracing.
    #[must_use]
    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Builder method to set buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Builder method to output to stderr.
    #[must_use]
    pub fn to_stderr(mut self) -> Self {
        self.output = TraceOutput::Stderr;
        self
    }

    /// Builder method to use JSON format.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Builder method to keep only the named events.
    #[must_use]
    pub fn filter_events<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.event_filter = names.into_iter().map(Into::into).collect();
        self
    }

    fn keeps(&self, event: &EngineEvent) -> bool {
        self.event_filter.is_empty() || self.event_filter.iter().any(|n| n == event.name())
    }
}

// =============================================================================
// Tracer
// =============================================================================

struct TracerState {
    config: TracerConfig,
    buffer: TraceBuffer,
    sequence: u64,
    start_time: Instant,
    human: HumanFormatter,
    json: JsonFormatter,
}

impl TracerState {
    fn format(&self, record: &TraceRecord) -> String {
        if self.config.json_format {
            self.json.format(record)
        } else {
            self.human.format(record)
        }
    }

    fn record(&mut self, event: &EngineEvent) {
        let sequence = self.sequence;
        self.sequence += 1;

        if !self.config.keeps(event) {
            return;
        }

        #[allow(clippy::cast_possible_truncation)]
        let timestamp_ns = self.start_time.elapsed().as_nanos() as u64;
        let id = self.buffer.push(sequence, timestamp_ns, event.clone());

        if self.config.output == TraceOutput::Stderr {
            if let Some(record) = self.buffer.get(id) {
                let _ = writeln!(io::stderr(), "{}", self.format(record));
            }
        }
    }
}

/// Records engine events.
///
/// Clones share one buffer. The listener installed by [`Tracer::attach`]
/// holds only a weak reference, so dropping every clone stops recording.
#[derive(Clone)]
pub struct Tracer {
    state: Rc<RefCell<TracerState>>,
}

impl Tracer {
    /// Creates a new tracer with the given configuration.
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        let buffer = TraceBuffer::new(config.buffer_size);
        Self {
            state: Rc::new(RefCell::new(TracerState {
                config,
                buffer,
                sequence: 0,
                start_time: Instant::now(),
                human: HumanFormatter::new().with_timestamps(),
                json: JsonFormatter::new(),
            })),
        }
    }

    /// Creates a tracer with default configuration (disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(TracerConfig::default())
    }

    /// Creates an enabled tracer that echoes to stderr.
    #[must_use]
    pub fn to_stderr() -> Self {
        Self::new(TracerConfig::new().enabled().to_stderr())
    }

    /// Subscribes the tracer to a notifier.
    pub fn attach(&self, notifier: &Notifier) -> ListenerId {
        let state: Weak<RefCell<TracerState>> = Rc::downgrade(&self.state);
        notifier.subscribe(move |event| {
            if let Some(state) = state.upgrade() {
                let mut state = state.borrow_mut();
                if state.config.enabled {
                    state.record(event);
                }
            }
        })
    }

    /// Returns whether tracing is enabled.
    #[must_use]
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state.borrow().config.enabled
    }

    /// Enables tracing.
    pub fn enable(&self) {
        self.state.borrow_mut().config.enabled = true;
    }

    /// Disables tracing.
    pub fn disable(&self) {
        self.state.borrow_mut().config.enabled = false;
    }

    /// Sets whether to use JSON output format.
    pub fn set_json_format(&self, json: bool) {
        self.state.borrow_mut().config.json_format = json;
    }

    /// Sets the trace output destination.
    pub fn set_output(&self, output: TraceOutput) {
        self.state.borrow_mut().config.output = output;
    }

    /// Records an event directly, bypassing any notifier.
    #[inline]
    pub fn record(&self, event: &EngineEvent) {
        let mut state = self.state.borrow_mut();
        if state.config.enabled {
            state.record(event);
        }
    }

    /// Number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().buffer.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().buffer.is_empty()
    }

    /// Returns every buffered record, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        self.state.borrow().buffer.iter().cloned().collect()
    }

    /// Returns the most recent `count` records, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<TraceRecord> {
        self.state
            .borrow()
            .buffer
            .recent(count)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns buffered records that report failures.
    #[must_use]
    pub fn errors(&self) -> Vec<TraceRecord> {
        self.state
            .borrow()
            .buffer
            .errors()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns the names of buffered events, oldest first.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.state
            .borrow()
            .buffer
            .iter()
            .map(TraceRecord::event_name)
            .collect()
    }

    /// Formats a record with the current format settings.
    #[must_use]
    pub fn format_record(&self, record: &TraceRecord) -> String {
        self.state.borrow().format(record)
    }

    /// Formats every buffered record with the current format settings.
    #[must_use]
    pub fn dump(&self) -> String {
        let state = self.state.borrow();
        let records: Vec<&TraceRecord> = state.buffer.iter().collect();
        if state.config.json_format {
            state.json.format_many(&records)
        } else {
            state.human.format_many(&records)
        }
    }

    /// Clears the trace buffer.
    pub fn clear(&self) {
        self.state.borrow_mut().buffer.clear();
    }

    /// Returns buffer statistics.
    #[must_use]
    pub fn stats(&self) -> TraceBufferStats {
        self.state.borrow().buffer.stats()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Tracer")
            .field("config", &state.config)
            .field("records", &state.buffer.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
