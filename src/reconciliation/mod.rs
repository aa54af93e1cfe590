//! Shift reconciliation: expected fuel sales against recorded sales, and the
//! workflow for resolving the resulting mismatches

pub mod calculator;
pub mod workflow;

pub use calculator::*;
pub use workflow::*;
