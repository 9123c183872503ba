//! Explanations for derived state.
//!
//! - [`why`] - Why does this logical fact exist?
//! - [`why_with_depth`] - The same, following support chains to a given depth

pub mod why;

pub use why::{DEFAULT_DEPTH, Explanation, ExplanationNode, why, why_with_depth};
