//! Core types and data structures for the station core

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Mint a fresh record identifier
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Lifecycle status of a work shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    /// Shift is in progress, end time not yet known
    Active,
    /// Shift was closed with end readings and closing cash
    Completed,
    /// Shift was abandoned; it never counts towards pay
    Cancelled,
}

/// Canonical record of a work shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub station_id: String,
    pub employee_id: String,
    pub start_time: NaiveDateTime,
    /// `None` while the shift is active
    pub end_time: Option<NaiveDateTime>,
    /// Dispensers operated during this shift
    pub dispenser_ids: Vec<String>,
    pub starting_cash: BigDecimal,
    pub ending_cash: Option<BigDecimal>,
    pub status: ShiftStatus,
}

impl Shift {
    /// Open a new active shift
    pub fn new(
        station_id: String,
        employee_id: String,
        dispenser_ids: Vec<String>,
        starting_cash: BigDecimal,
        start_time: NaiveDateTime,
    ) -> StationResult<Self> {
        if starting_cash < BigDecimal::from(0) {
            return Err(StationError::Validation(
                "Starting cash cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            id: new_id(),
            station_id,
            employee_id,
            start_time,
            end_time: None,
            dispenser_ids,
            starting_cash,
            ending_cash: None,
            status: ShiftStatus::Active,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == ShiftStatus::Active
    }

    /// Worked time, measuring an open shift against `now`.
    ///
    /// Never negative: a clock behind the start time yields zero.
    pub fn worked_duration(&self, now: NaiveDateTime) -> Duration {
        let end = self.end_time.unwrap_or(now);
        let worked = end - self.start_time;
        if worked < Duration::zero() {
            Duration::zero()
        } else {
            worked
        }
    }

    /// Transition an active shift to completed
    pub fn complete(&mut self, ending_cash: BigDecimal, at: NaiveDateTime) -> StationResult<()> {
        self.ensure_active("complete")?;
        if ending_cash < BigDecimal::from(0) {
            return Err(StationError::Validation(
                "Ending cash cannot be negative".to_string(),
            ));
        }
        if at < self.start_time {
            return Err(StationError::Validation(format!(
                "Shift '{}' cannot end before it started",
                self.id
            )));
        }

        self.end_time = Some(at);
        self.ending_cash = Some(ending_cash);
        self.status = ShiftStatus::Completed;
        Ok(())
    }

    /// Transition an active shift to cancelled
    pub fn cancel(&mut self, at: NaiveDateTime) -> StationResult<()> {
        self.ensure_active("cancel")?;
        self.end_time = Some(at.max(self.start_time));
        self.status = ShiftStatus::Cancelled;
        Ok(())
    }

    fn ensure_active(&self, action: &str) -> StationResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StationError::InvalidShiftState {
                shift_id: self.id.clone(),
                reason: format!("cannot {} a {:?} shift", action, self.status),
            })
        }
    }
}

/// Start/end volumetric counter of one dispenser and fuel type within a shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    pub id: String,
    pub shift_id: String,
    pub dispenser_id: String,
    pub fuel_type: String,
    pub start_reading: BigDecimal,
    /// Set only when the shift is closed
    pub end_reading: Option<BigDecimal>,
}

impl MeterReading {
    /// Record an opening reading
    pub fn new(
        shift_id: String,
        dispenser_id: String,
        fuel_type: String,
        start_reading: BigDecimal,
    ) -> StationResult<Self> {
        if start_reading < BigDecimal::from(0) {
            return Err(StationError::Validation(format!(
                "Meter reading for dispenser '{}' cannot be negative",
                dispenser_id
            )));
        }
        if fuel_type.trim().is_empty() {
            return Err(StationError::Validation(
                "Fuel type cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: new_id(),
            shift_id,
            dispenser_id,
            fuel_type,
            start_reading,
            end_reading: None,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.end_reading.is_some()
    }

    /// Set the closing counter value. A counter never runs backwards.
    pub fn close(&mut self, end_reading: BigDecimal) -> StationResult<()> {
        if end_reading < self.start_reading {
            return Err(StationError::InvalidMeterDelta {
                reading_id: self.id.clone(),
                start: self.start_reading.clone(),
                end: end_reading,
            });
        }
        self.end_reading = Some(end_reading);
        Ok(())
    }

    /// Volume dispensed between the opening and closing counter values
    pub fn volume(&self) -> StationResult<BigDecimal> {
        let end = self
            .end_reading
            .as_ref()
            .ok_or_else(|| StationError::ShiftNotClosed(self.shift_id.clone()))?;

        let volume = end - &self.start_reading;
        if volume < BigDecimal::from(0) {
            return Err(StationError::InvalidMeterDelta {
                reading_id: self.id.clone(),
                start: self.start_reading.clone(),
                end: end.clone(),
            });
        }
        Ok(volume)
    }
}

/// How a sale was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileMoney,
    Credit,
    Other,
}

/// A posted sale. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub station_id: String,
    pub shift_id: String,
    pub total_amount: BigDecimal,
    pub payment_method: PaymentMethod,
    pub created_at: NaiveDateTime,
}

impl Transaction {
    pub fn new(
        station_id: String,
        shift_id: String,
        total_amount: BigDecimal,
        payment_method: PaymentMethod,
        created_at: NaiveDateTime,
    ) -> StationResult<Self> {
        if total_amount < BigDecimal::from(0) {
            return Err(StationError::Validation(
                "Transaction total cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            id: new_id(),
            station_id,
            shift_id,
            total_amount,
            payment_method,
            created_at,
        })
    }
}

/// A station expense. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub station_id: String,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    /// Free-form category, e.g. "utilities" or "maintenance"
    pub expense_type: String,
}

impl Expense {
    pub fn new(
        station_id: String,
        amount: BigDecimal,
        date: NaiveDate,
        expense_type: String,
    ) -> StationResult<Self> {
        if amount < BigDecimal::from(0) {
            return Err(StationError::Validation(
                "Expense amount cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            id: new_id(),
            station_id,
            amount,
            date,
            expense_type,
        })
    }
}

/// Current price of a fuel type at a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPrice {
    pub station_id: String,
    pub fuel_type: String,
    pub price_per_unit: BigDecimal,
}

impl FuelPrice {
    pub fn new(
        station_id: String,
        fuel_type: String,
        price_per_unit: BigDecimal,
    ) -> StationResult<Self> {
        if price_per_unit <= BigDecimal::from(0) {
            return Err(StationError::Validation(format!(
                "Price for '{}' must be positive",
                fuel_type
            )));
        }

        Ok(Self {
            station_id,
            fuel_type,
            price_per_unit,
        })
    }
}

/// Employee profile as far as payroll is concerned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub station_id: String,
    pub hourly_rate: BigDecimal,
}

impl Employee {
    pub fn new(id: String, station_id: String, hourly_rate: BigDecimal) -> StationResult<Self> {
        if hourly_rate < BigDecimal::from(0) {
            return Err(StationError::Validation(
                "Hourly rate cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            id,
            station_id,
            hourly_rate,
        })
    }
}

/// Workflow state of a sales mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchState {
    Unresolved,
    /// Terminal
    Resolved,
}

/// Who closed a mismatch, when, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_by: String,
    pub note: String,
    pub resolved_at: NaiveDateTime,
}

/// Signed difference between actual and expected sales for one shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SalesMismatchRecord")]
pub struct SalesMismatch {
    pub id: String,
    pub shift_id: String,
    expected_amount: BigDecimal,
    actual_amount: BigDecimal,
    mismatch_amount: BigDecimal,
    resolution: Option<Resolution>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SalesMismatch {
    /// Create an unresolved mismatch; the signed amount is `actual - expected`
    pub fn new(shift_id: String, expected_amount: BigDecimal, actual_amount: BigDecimal) -> Self {
        let now = now();
        let mismatch_amount = &actual_amount - &expected_amount;
        Self {
            id: new_id(),
            shift_id,
            expected_amount,
            actual_amount,
            mismatch_amount,
            resolution: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn expected_amount(&self) -> &BigDecimal {
        &self.expected_amount
    }

    pub fn actual_amount(&self) -> &BigDecimal {
        &self.actual_amount
    }

    /// Positive for a surplus, negative for a deficit
    pub fn mismatch_amount(&self) -> &BigDecimal {
        &self.mismatch_amount
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub fn resolution_note(&self) -> Option<&str> {
        self.resolution.as_ref().map(|r| r.note.as_str())
    }

    pub fn resolved_by(&self) -> Option<&str> {
        self.resolution.as_ref().map(|r| r.resolved_by.as_str())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn state(&self) -> MismatchState {
        if self.is_resolved() {
            MismatchState::Resolved
        } else {
            MismatchState::Unresolved
        }
    }

    /// Apply the single Unresolved -> Resolved transition.
    ///
    /// Leaves the record untouched on any error.
    pub fn resolve(
        &mut self,
        resolver_id: &str,
        note: &str,
        at: NaiveDateTime,
    ) -> StationResult<()> {
        if self.is_resolved() {
            return Err(StationError::AlreadyResolved(self.id.clone()));
        }
        if resolver_id.trim().is_empty() {
            return Err(StationError::Validation(
                "Resolver ID cannot be empty".to_string(),
            ));
        }
        if note.trim().is_empty() {
            return Err(StationError::Validation(
                "Resolution note cannot be empty".to_string(),
            ));
        }

        self.resolution = Some(Resolution {
            resolved_by: resolver_id.to_string(),
            note: note.trim().to_string(),
            resolved_at: at,
        });
        self.updated_at = at;
        Ok(())
    }
}

/// Stored shape of a `SalesMismatch`, checked before it becomes one
#[derive(Debug, Clone, Deserialize)]
pub struct SalesMismatchRecord {
    pub id: String,
    pub shift_id: String,
    pub expected_amount: BigDecimal,
    pub actual_amount: BigDecimal,
    pub mismatch_amount: BigDecimal,
    pub resolution: Option<Resolution>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<SalesMismatchRecord> for SalesMismatch {
    type Error = StationError;

    fn try_from(record: SalesMismatchRecord) -> StationResult<Self> {
        if record.mismatch_amount != &record.actual_amount - &record.expected_amount {
            return Err(StationError::Validation(format!(
                "Mismatch '{}' amount {} is not actual {} minus expected {}",
                record.id, record.mismatch_amount, record.actual_amount, record.expected_amount
            )));
        }
        if let Some(resolution) = &record.resolution {
            if resolution.resolved_by.trim().is_empty() || resolution.note.trim().is_empty() {
                return Err(StationError::Validation(format!(
                    "Mismatch '{}' has a resolution without resolver or note",
                    record.id
                )));
            }
        }

        Ok(Self {
            id: record.id,
            shift_id: record.shift_id,
            expected_amount: record.expected_amount,
            actual_amount: record.actual_amount,
            mismatch_amount: record.mismatch_amount,
            resolution: record.resolution,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Granularity of a financial report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Daily => "daily",
            ReportType::Weekly => "weekly",
            ReportType::Monthly => "monthly",
            ReportType::Yearly => "yearly",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportType::Daily),
            "weekly" => Ok(ReportType::Weekly),
            "monthly" => Ok(ReportType::Monthly),
            "yearly" => Ok(ReportType::Yearly),
            _ => Err(StationError::InvalidReportType(s.to_string())),
        }
    }
}

/// Persisted rollup of sales, expenses and profit for a station over one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FinancialReportRecord")]
pub struct FinancialReport {
    pub id: String,
    pub station_id: String,
    pub report_type: ReportType,
    /// First day of the report's window
    pub report_date: NaiveDate,
    sales_amount: BigDecimal,
    expenses_amount: BigDecimal,
    profit_amount: BigDecimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl FinancialReport {
    /// Create a report; profit is always derived from sales and expenses
    pub fn new(
        station_id: String,
        report_type: ReportType,
        report_date: NaiveDate,
        sales_amount: BigDecimal,
        expenses_amount: BigDecimal,
    ) -> Self {
        let now = now();
        let profit_amount = &sales_amount - &expenses_amount;
        Self {
            id: new_id(),
            station_id,
            report_type,
            report_date,
            sales_amount,
            expenses_amount,
            profit_amount,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn sales_amount(&self) -> &BigDecimal {
        &self.sales_amount
    }

    pub fn expenses_amount(&self) -> &BigDecimal {
        &self.expenses_amount
    }

    pub fn profit_amount(&self) -> &BigDecimal {
        &self.profit_amount
    }

    /// Key under which at most one report is stored
    pub fn key(&self) -> ReportKey {
        ReportKey {
            station_id: self.station_id.clone(),
            report_type: self.report_type,
            report_date: self.report_date,
        }
    }

    /// Take over the identity of a previously stored report for the same key
    pub fn replacing(mut self, prior: &FinancialReport) -> Self {
        self.id = prior.id.clone();
        self.created_at = prior.created_at;
        self
    }
}

/// Stored shape of a `FinancialReport`, checked before it becomes one
#[derive(Debug, Clone, Deserialize)]
pub struct FinancialReportRecord {
    pub id: String,
    pub station_id: String,
    pub report_type: ReportType,
    pub report_date: NaiveDate,
    pub sales_amount: BigDecimal,
    pub expenses_amount: BigDecimal,
    pub profit_amount: BigDecimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<FinancialReportRecord> for FinancialReport {
    type Error = StationError;

    fn try_from(record: FinancialReportRecord) -> StationResult<Self> {
        if record.profit_amount != &record.sales_amount - &record.expenses_amount {
            return Err(StationError::Validation(format!(
                "Report '{}' profit {} is not sales {} minus expenses {}",
                record.id, record.profit_amount, record.sales_amount, record.expenses_amount
            )));
        }

        Ok(Self {
            id: record.id,
            station_id: record.station_id,
            report_type: record.report_type,
            report_date: record.report_date,
            sales_amount: record.sales_amount,
            expenses_amount: record.expenses_amount,
            profit_amount: record.profit_amount,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Uniqueness key of a financial report
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportKey {
    pub station_id: String,
    pub report_type: ReportType,
    pub report_date: NaiveDate,
}

/// Inclusive date range used for report queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> StationResult<Self> {
        if end < start {
            return Err(StationError::Validation(format!(
                "Date range end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Broad classification of failures, as surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    State,
    DataIntegrity,
    Dependency,
    Concurrency,
}

/// Errors that can occur in the station core
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Shift not found: {0}")]
    ShiftNotFound(String),
    #[error("Sales mismatch not found: {0}")]
    MismatchNotFound(String),
    #[error("Employee not found: {0}")]
    EmployeeNotFound(String),
    #[error("Shift is not closed: {0}")]
    ShiftNotClosed(String),
    #[error("Sales mismatch already resolved: {0}")]
    AlreadyResolved(String),
    #[error("Invalid shift state for '{shift_id}': {reason}")]
    InvalidShiftState { shift_id: String, reason: String },
    #[error("Employee already has an active shift: {0}")]
    ActiveShiftExists(String),
    #[error("Invalid meter delta on reading '{reading_id}': end {end} is below start {start}")]
    InvalidMeterDelta {
        reading_id: String,
        start: BigDecimal,
        end: BigDecimal,
    },
    #[error("Sales mismatch already exists for shift: {0}")]
    MismatchAlreadyExists(String),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Invalid report type: {0}")]
    InvalidReportType(String),
    #[error("Dependency error: {0}")]
    Dependency(String),
}

impl StationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StationError::Validation(_) | StationError::InvalidReportType(_) => {
                ErrorKind::Validation
            }
            StationError::ShiftNotFound(_)
            | StationError::MismatchNotFound(_)
            | StationError::EmployeeNotFound(_) => ErrorKind::NotFound,
            StationError::ShiftNotClosed(_)
            | StationError::AlreadyResolved(_)
            | StationError::InvalidShiftState { .. }
            | StationError::ActiveShiftExists(_) => ErrorKind::State,
            StationError::InvalidMeterDelta { .. } => ErrorKind::DataIntegrity,
            StationError::MismatchAlreadyExists(_) | StationError::DuplicateKey(_) => {
                ErrorKind::Concurrency
            }
            StationError::Dependency(_) => ErrorKind::Dependency,
        }
    }

    /// Only infrastructure failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Dependency
    }
}

/// Result type for station core operations
pub type StationResult<T> = Result<T, StationError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_meter_reading_rejects_backwards_close() {
        let mut reading = MeterReading::new(
            "shift-1".to_string(),
            "pump-1".to_string(),
            "Petrol".to_string(),
            dec("1000"),
        )
        .unwrap();

        let err = reading.close(dec("999.5")).unwrap_err();
        assert!(matches!(err, StationError::InvalidMeterDelta { .. }));
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        assert!(!reading.is_closed());

        reading.close(dec("1050")).unwrap();
        assert_eq!(reading.volume().unwrap(), dec("50"));
    }

    #[test]
    fn test_open_reading_has_no_volume() {
        let reading = MeterReading::new(
            "shift-1".to_string(),
            "pump-1".to_string(),
            "Diesel".to_string(),
            dec("10"),
        )
        .unwrap();
        assert!(matches!(
            reading.volume(),
            Err(StationError::ShiftNotClosed(_))
        ));
    }

    #[test]
    fn test_shift_lifecycle() {
        let mut shift = Shift::new(
            "st-1".to_string(),
            "emp-1".to_string(),
            vec!["pump-1".to_string()],
            dec("100"),
            at(8, 0),
        )
        .unwrap();

        assert_eq!(shift.worked_duration(at(10, 30)), Duration::minutes(150));

        shift.complete(dec("480.25"), at(16, 0)).unwrap();
        assert_eq!(shift.status, ShiftStatus::Completed);
        assert_eq!(shift.worked_duration(at(23, 0)), Duration::hours(8));

        let err = shift.cancel(at(17, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_mismatch_amount_is_derived() {
        let mismatch = SalesMismatch::new("shift-1".to_string(), dec("99"), dec("95"));
        assert_eq!(mismatch.mismatch_amount(), &dec("-4"));
        assert_eq!(mismatch.state(), MismatchState::Unresolved);
        assert!(mismatch.resolution_note().is_none());
    }

    #[test]
    fn test_mismatch_resolve_rejects_blank_note_without_mutation() {
        let mut mismatch = SalesMismatch::new("shift-1".to_string(), dec("10"), dec("10"));
        let before = mismatch.clone();

        let err = mismatch.resolve("emp-7", "   ", at(9, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(mismatch, before);

        mismatch.resolve("emp-7", " Pump 3 drift ", at(9, 0)).unwrap();
        assert_eq!(mismatch.resolution_note(), Some("Pump 3 drift"));
        assert_eq!(mismatch.resolved_by(), Some("emp-7"));
        assert_eq!(mismatch.updated_at, at(9, 0));

        let resolved = mismatch.clone();
        let err = mismatch.resolve("emp-8", "again", at(10, 0)).unwrap_err();
        assert!(matches!(err, StationError::AlreadyResolved(_)));
        assert_eq!(mismatch, resolved);
    }

    #[test]
    fn test_report_profit_is_derived() {
        let report = FinancialReport::new(
            "st-1".to_string(),
            ReportType::Daily,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            dec("1200.00"),
            dec("300.00"),
        );
        assert_eq!(report.profit_amount(), &dec("900.00"));
    }

    #[test]
    fn test_stored_report_with_inconsistent_profit_is_rejected() {
        let report = FinancialReport::new(
            "st-1".to_string(),
            ReportType::Daily,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            dec("10"),
            dec("1"),
        );
        let mut json = serde_json::to_value(&report).unwrap();
        let restored: FinancialReport = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(restored, report);

        json["profit_amount"] = serde_json::to_value(dec("5")).unwrap();
        assert!(serde_json::from_value::<FinancialReport>(json).is_err());
    }

    #[test]
    fn test_stored_mismatch_is_checked_on_load() {
        let mut mismatch = SalesMismatch::new("shift-1".to_string(), dec("99"), dec("95"));
        let json = serde_json::to_value(&mismatch).unwrap();
        let restored: SalesMismatch = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(restored, mismatch);

        let mut drifted = json.clone();
        drifted["mismatch_amount"] = serde_json::to_value(dec("7")).unwrap();
        assert!(serde_json::from_value::<SalesMismatch>(drifted).is_err());

        let at = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        mismatch.resolve("emp-7", "Pump 3 drift", at).unwrap();
        let mut blank = serde_json::to_value(&mismatch).unwrap();
        blank["resolution"]["resolved_by"] = serde_json::json!("");
        blank["resolution"]["note"] = serde_json::json!("  ");
        assert!(serde_json::from_value::<SalesMismatch>(blank).is_err());
    }

    #[test]
    fn test_report_type_parsing() {
        assert_eq!("Monthly".parse::<ReportType>().unwrap(), ReportType::Monthly);
        let err = "hourly".parse::<ReportType>().unwrap_err();
        assert!(matches!(err, StationError::InvalidReportType(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_only_dependency_errors_are_retryable() {
        assert!(StationError::Dependency("timeout".to_string()).is_retryable());
        assert!(!StationError::AlreadyResolved("m-1".to_string()).is_retryable());
    }
}
