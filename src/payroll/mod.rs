//! Payroll derived from the shift ledger

pub mod salary;

pub use salary::*;
