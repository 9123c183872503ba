//! Core types, values, and persistent collections for Ember.
//!
//! This crate provides:
//! - [`Value`] - The dynamic value type carried by facts and bindings
//! - [`Fact`] / [`FactId`] - Typed, immutable working-memory records
//! - [`Type`] - Field type descriptors for schema validation
//! - [`Error`] - Rich error types with context
//! - Persistent collections ([`LtVec`], [`LtMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod error;
pub mod fact;
pub mod types;
pub mod value;

pub use collections::{LtMap, LtVec};
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use fact::{Fact, FactId, FactRef, KIND_FIELD};
pub use types::Type;
pub use value::{Record, Value, record};
