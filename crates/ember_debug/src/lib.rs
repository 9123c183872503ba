//! Tracing and explanations for Ember.
//!
//! This crate provides:
//! - [`Tracer`] - Records engine events into a bounded ring buffer
//! - [`explain::why`] - Explains why a logical fact exists

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod explain;
pub mod trace;

pub use explain::{DEFAULT_DEPTH, Explanation, ExplanationNode, why, why_with_depth};
pub use trace::{
    HumanFormatter, JsonFormatter, TraceBuffer, TraceBufferStats, TraceFormatter, TraceOutput,
    TraceRecord, Tracer, TracerConfig,
};
