//! # Station Core
//!
//! Fuel station back-office core: shift reconciliation, mismatch resolution,
//! payroll and periodic financial reporting.
//!
//! ## Features
//!
//! - **Shift ledger**: opening and closing shifts with their dispenser meter readings
//! - **Reconciliation**: expected fuel sales from meter deltas and current prices,
//!   compared against posted transactions
//! - **Mismatch workflow**: one-way `Unresolved -> Resolved` resolution with a note
//! - **Payroll**: flat hourly salary from worked shift time
//! - **Financial reporting**: daily, weekly, monthly and yearly sales/expense/profit rollups
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use station_core::{utils::MemoryStorage, StationCore};
//!
//! let core = StationCore::new(MemoryStorage::new());
//! // let outcome = core.calculate_sales_mismatch("shift-id").await?;
//! // let ack = core.resolve_sales_mismatch(&outcome.mismatch.id, "emp-7", "Pump 3 drift").await?;
//! # let _ = core;
//! ```

pub mod config;
pub mod ledger;
pub mod payroll;
pub mod reconciliation;
pub mod reporting;
pub mod station;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::CoreConfig;
pub use ledger::*;
pub use payroll::*;
pub use reconciliation::*;
pub use reporting::*;
pub use station::StationCore;
pub use traits::*;
pub use types::*;
