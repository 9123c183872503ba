//! Indexed fact store and fact schemas for Ember.
//!
//! This crate provides:
//! - [`FactStore`] - Working memory with identity assignment and a kind index
//! - [`FactEntry`] / [`FactMeta`] - Stored facts plus truth-maintenance metadata
//! - [`SchemaRegistry`] - Per-kind field defaults, requirements and type checks

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod schema;
pub mod store;

pub use schema::{FactSchema, FieldDefault, FieldSchema, SchemaRegistry};
pub use store::{ActivationId, FactEntry, FactMeta, FactStore};
