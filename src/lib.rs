//! Ember - embedded forward-chaining inference engine
//!
//! This crate re-exports all layers of the Ember system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: ember_debug      - Event tracing, justification explanations
//! Layer 2: ember_engine     - Matcher, accumulators, agenda, rules, queries, TMS
//! Layer 1: ember_storage    - Indexed fact store, schemas
//! Layer 0: ember_foundation - Core types (Value, Fact, FactId, Error)
//! ```

pub use ember_debug as debug;
pub use ember_engine as engine;
pub use ember_foundation as foundation;
pub use ember_storage as storage;
