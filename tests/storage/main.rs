//! Integration tests for Layer 1: Storage
//!
//! Tests for the indexed fact store and fact schemas.

mod schemas;
mod store;
