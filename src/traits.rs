//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validation::{validate_id, validate_non_negative};

/// Storage abstraction for the station core
///
/// This trait allows the core to work with any storage backend (PostgreSQL,
/// SQLite, in-memory, etc.). Implementations must enforce the uniqueness
/// constraints documented on `insert_mismatch`, `store_resolution` and
/// `upsert_report` inside a single critical section or database transaction;
/// the core relies on them instead of check-then-insert.
#[async_trait]
pub trait StationStorage: Send + Sync {
    /// Persist a new shift together with its opening meter readings.
    ///
    /// Must fail with `StationError::ActiveShiftExists` if the employee already
    /// has an active shift.
    async fn insert_shift(&self, shift: &Shift, readings: &[MeterReading]) -> StationResult<()>;

    /// Persist a closed or cancelled shift and its readings as one unit of work.
    ///
    /// The write is a compare-and-set on the stored status: it must fail with
    /// `StationError::InvalidShiftState` unless the stored shift is still
    /// active, and with `StationError::ShiftNotFound` if it is absent.
    async fn update_shift(&self, shift: &Shift, readings: &[MeterReading]) -> StationResult<()>;

    /// Get a shift by ID
    async fn get_shift(&self, shift_id: &str) -> StationResult<Option<Shift>>;

    /// The employee's active shift, if any
    async fn find_active_shift(&self, employee_id: &str) -> StationResult<Option<Shift>>;

    /// Shifts of an employee whose start time falls in `[start, end)`
    async fn list_employee_shifts(
        &self,
        employee_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StationResult<Vec<Shift>>;

    /// Meter readings recorded for a shift
    async fn get_meter_readings(&self, shift_id: &str) -> StationResult<Vec<MeterReading>>;

    /// Save a posted sale
    async fn save_transaction(&self, transaction: &Transaction) -> StationResult<()>;

    /// All sales attributed to a shift
    async fn get_shift_transactions(&self, shift_id: &str) -> StationResult<Vec<Transaction>>;

    /// Sales of a station created on a date in `[start, end)`
    async fn get_station_transactions(
        &self,
        station_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StationResult<Vec<Transaction>>;

    /// Save an expense
    async fn save_expense(&self, expense: &Expense) -> StationResult<()>;

    /// Expenses of a station dated in `[start, end)`
    async fn get_station_expenses(
        &self,
        station_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StationResult<Vec<Expense>>;

    /// Current price of a fuel type at a station
    async fn get_fuel_price(
        &self,
        station_id: &str,
        fuel_type: &str,
    ) -> StationResult<Option<FuelPrice>>;

    /// Get an employee profile by ID
    async fn get_employee(&self, employee_id: &str) -> StationResult<Option<Employee>>;

    /// Insert a new mismatch.
    ///
    /// Must fail with `StationError::DuplicateKey` if a mismatch already exists
    /// for the same shift.
    async fn insert_mismatch(&self, mismatch: &SalesMismatch) -> StationResult<()>;

    /// Persist a resolved mismatch.
    ///
    /// Must fail with `StationError::AlreadyResolved` if the stored record is
    /// already resolved, and with `StationError::MismatchNotFound` if absent.
    async fn store_resolution(&self, mismatch: &SalesMismatch) -> StationResult<()>;

    /// Get a mismatch by ID
    async fn get_mismatch(&self, mismatch_id: &str) -> StationResult<Option<SalesMismatch>>;

    /// Get the mismatch recorded for a shift
    async fn get_shift_mismatch(&self, shift_id: &str) -> StationResult<Option<SalesMismatch>>;

    /// Mismatches for shifts of a station, optionally filtered by resolution
    async fn list_mismatches(
        &self,
        station_id: &str,
        resolved: Option<bool>,
    ) -> StationResult<Vec<SalesMismatch>>;

    /// Insert or overwrite the report stored under the same `ReportKey`,
    /// returning the row as stored.
    async fn upsert_report(&self, report: FinancialReport) -> StationResult<FinancialReport>;

    /// Reports for a station, optionally filtered by type and report date
    async fn list_reports(
        &self,
        station_id: &str,
        report_type: Option<ReportType>,
        date_range: Option<DateRange>,
    ) -> StationResult<Vec<FinancialReport>>;
}

/// Actions recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    ShiftStarted,
    ShiftClosed,
    ShiftCancelled,
    MismatchCalculated,
    MismatchResolved,
    ReportGenerated,
}

/// One entry for the activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub action: ActivityAction,
    /// Employee or user that triggered the action, when known
    pub actor_id: Option<String>,
    pub station_id: Option<String>,
    /// ID of the shift, mismatch or report affected
    pub subject_id: String,
    pub description: String,
    pub occurred_at: NaiveDateTime,
}

/// Fire-and-forget activity logging sink.
///
/// Errors returned here are logged and never fail the operation that emitted
/// the event.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, event: &ActivityEvent) -> StationResult<()>;
}

/// Activity sink writing events to the `tracing` pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivitySink;

#[async_trait]
impl ActivitySink for TracingActivitySink {
    async fn record(&self, event: &ActivityEvent) -> StationResult<()> {
        tracing::info!(
            target: "station_core::activity",
            action = ?event.action,
            actor_id = event.actor_id.as_deref().unwrap_or("system"),
            station_id = event.station_id.as_deref().unwrap_or("-"),
            subject_id = %event.subject_id,
            "{}",
            event.description
        );
        Ok(())
    }
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }
}

/// Clock pinned to a fixed instant, for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Request to open a shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShift {
    pub station_id: String,
    pub employee_id: String,
    pub dispenser_ids: Vec<String>,
    pub starting_cash: BigDecimal,
    pub opening_readings: Vec<OpeningReading>,
}

/// Opening counter value of one dispenser and fuel type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningReading {
    pub dispenser_id: String,
    pub fuel_type: String,
    pub start_reading: BigDecimal,
}

/// Closing counter value for a previously recorded reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosingReading {
    pub reading_id: String,
    pub end_reading: BigDecimal,
}

/// Trait for implementing custom shift-opening rules
pub trait ShiftValidator: Send + Sync {
    /// Validate a shift request before anything is stored
    fn validate_new_shift(&self, request: &NewShift) -> StationResult<()>;
}

/// Default shift validator: identifiers present, readings on assigned
/// dispensers, one reading per dispenser and fuel type
pub struct DefaultShiftValidator;

impl ShiftValidator for DefaultShiftValidator {
    fn validate_new_shift(&self, request: &NewShift) -> StationResult<()> {
        validate_id("Station ID", &request.station_id)?;
        validate_id("Employee ID", &request.employee_id)?;
        validate_non_negative("Starting cash", &request.starting_cash)?;

        if request.dispenser_ids.is_empty() {
            return Err(StationError::Validation(
                "A shift must be assigned at least one dispenser".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for reading in &request.opening_readings {
            validate_non_negative("Opening reading", &reading.start_reading)?;
            if !request.dispenser_ids.contains(&reading.dispenser_id) {
                return Err(StationError::Validation(format!(
                    "Dispenser '{}' is not assigned to this shift",
                    reading.dispenser_id
                )));
            }
            if !seen.insert((&reading.dispenser_id, &reading.fuel_type)) {
                return Err(StationError::Validation(format!(
                    "Duplicate opening reading for dispenser '{}' and fuel '{}'",
                    reading.dispenser_id, reading.fuel_type
                )));
            }
        }

        Ok(())
    }
}
