//! Shift ledger: shifts and their meter readings

pub mod meter;
pub mod shift;

pub use meter::*;
pub use shift::*;
