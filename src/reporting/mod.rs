//! Periodic financial reporting

pub mod aggregator;
pub mod period;

pub use aggregator::*;
pub use period::*;
