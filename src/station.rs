//! Station core orchestrator that exposes the boundary operations

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::CoreConfig;
use crate::ledger::{MeterReadingBook, ShiftManager, ShiftSnapshot};
use crate::payroll::{SalaryCalculator, SalaryStatement};
use crate::reconciliation::{MismatchWorkflow, ReconciliationCalculator, ReconciliationOutcome};
use crate::reporting::ReportAggregator;
use crate::traits::*;
use crate::types::*;

/// Main entry point coordinating the shift ledger, reconciliation, payroll
/// and reporting components over one storage backend
pub struct StationCore<S: StationStorage> {
    shifts: ShiftManager<S>,
    meters: MeterReadingBook<S>,
    reconciliation: ReconciliationCalculator<S>,
    mismatches: MismatchWorkflow<S>,
    salaries: SalaryCalculator<S>,
    reports: ReportAggregator<S>,
    activity: Arc<dyn ActivitySink>,
    clock: Arc<dyn Clock>,
}

impl<S: StationStorage + Clone> StationCore<S> {
    /// Create a station core with the default configuration, the system clock
    /// and activity events written to `tracing`
    pub fn new(storage: S) -> Self {
        Self::assemble(
            storage,
            CoreConfig::default(),
            Arc::new(SystemClock),
            Arc::new(TracingActivitySink),
        )
    }

    /// Create a station core with explicit configuration and collaborators
    pub fn with_config(
        storage: S,
        config: CoreConfig,
        clock: Arc<dyn Clock>,
        activity: Arc<dyn ActivitySink>,
    ) -> StationResult<Self> {
        config.validate()?;
        Ok(Self::assemble(storage, config, clock, activity))
    }

    fn assemble(
        storage: S,
        config: CoreConfig,
        clock: Arc<dyn Clock>,
        activity: Arc<dyn ActivitySink>,
    ) -> Self {
        Self {
            shifts: ShiftManager::new(storage.clone(), clock.clone()),
            meters: MeterReadingBook::new(storage.clone()),
            reconciliation: ReconciliationCalculator::new(storage.clone(), config.clone()),
            mismatches: MismatchWorkflow::new(storage.clone(), clock.clone()),
            salaries: SalaryCalculator::new(storage.clone(), clock.clone(), config.clone()),
            reports: ReportAggregator::new(storage, config),
            activity,
            clock,
        }
    }

    // Shift ledger operations
    /// Open a shift with its opening meter readings
    pub async fn start_shift(&self, request: NewShift) -> StationResult<ShiftSnapshot> {
        let snapshot = self.shifts.start_shift(request).await?;
        self.emit(
            ActivityAction::ShiftStarted,
            Some(snapshot.shift.employee_id.as_str()),
            Some(snapshot.shift.station_id.as_str()),
            &snapshot.shift.id,
            format!("Shift started with {} dispenser(s)", snapshot.shift.dispenser_ids.len()),
        )
        .await;
        Ok(snapshot)
    }

    /// Close an active shift with closing cash and meter values
    pub async fn close_shift(
        &self,
        shift_id: &str,
        ending_cash: BigDecimal,
        closing_readings: Vec<ClosingReading>,
    ) -> StationResult<ShiftSnapshot> {
        let snapshot = self
            .shifts
            .close_shift(shift_id, ending_cash, closing_readings)
            .await?;
        self.emit(
            ActivityAction::ShiftClosed,
            Some(snapshot.shift.employee_id.as_str()),
            Some(snapshot.shift.station_id.as_str()),
            &snapshot.shift.id,
            "Shift closed".to_string(),
        )
        .await;
        Ok(snapshot)
    }

    /// Cancel an active shift
    pub async fn cancel_shift(&self, shift_id: &str) -> StationResult<Shift> {
        let shift = self.shifts.cancel_shift(shift_id).await?;
        self.emit(
            ActivityAction::ShiftCancelled,
            Some(shift.employee_id.as_str()),
            Some(shift.station_id.as_str()),
            &shift.id,
            "Shift cancelled".to_string(),
        )
        .await;
        Ok(shift)
    }

    /// Get a shift by ID
    pub async fn get_shift(&self, shift_id: &str) -> StationResult<Option<Shift>> {
        self.shifts.get_shift(shift_id).await
    }

    /// The employee's active shift, if any
    pub async fn active_shift_for(&self, employee_id: &str) -> StationResult<Option<Shift>> {
        self.shifts.active_shift_for(employee_id).await
    }

    /// Meter readings of a shift
    pub async fn shift_readings(&self, shift_id: &str) -> StationResult<Vec<MeterReading>> {
        self.meters.readings(shift_id).await
    }

    /// Dispensed volume per fuel type of a closed shift
    pub async fn shift_volumes(&self, shift_id: &str) -> StationResult<BTreeMap<String, BigDecimal>> {
        let readings = self.meters.closed_readings(shift_id).await?;
        MeterReadingBook::<S>::volume_by_fuel(&readings)
    }

    // Reconciliation operations
    /// Reconcile a closed shift and record its sales mismatch
    pub async fn calculate_sales_mismatch(
        &self,
        shift_id: &str,
    ) -> StationResult<ReconciliationOutcome> {
        let outcome = self.reconciliation.calculate(shift_id).await?;
        self.emit(
            ActivityAction::MismatchCalculated,
            None,
            None,
            &outcome.mismatch.id,
            format!(
                "Shift {} reconciled: expected {}, actual {}, mismatch {}",
                shift_id,
                outcome.mismatch.expected_amount(),
                outcome.mismatch.actual_amount(),
                outcome.mismatch.mismatch_amount()
            ),
        )
        .await;
        Ok(outcome)
    }

    /// Compute a shift's reconciliation without recording it
    pub async fn preview_sales_mismatch(
        &self,
        shift_id: &str,
    ) -> StationResult<ReconciliationOutcome> {
        self.reconciliation.preview(shift_id).await
    }

    /// Resolve a mismatch; returns the updated record as acknowledgement
    pub async fn resolve_sales_mismatch(
        &self,
        mismatch_id: &str,
        resolver_id: &str,
        note: &str,
    ) -> StationResult<SalesMismatch> {
        let mismatch = self
            .mismatches
            .resolve(mismatch_id, resolver_id, note)
            .await?;
        self.emit(
            ActivityAction::MismatchResolved,
            Some(resolver_id),
            None,
            &mismatch.id,
            format!("Mismatch on shift {} resolved", mismatch.shift_id),
        )
        .await;
        Ok(mismatch)
    }

    /// Get a mismatch by ID
    pub async fn get_sales_mismatch(&self, mismatch_id: &str) -> StationResult<Option<SalesMismatch>> {
        self.mismatches.get(mismatch_id).await
    }

    /// The mismatch recorded for a shift, if it was reconciled
    pub async fn get_shift_mismatch(&self, shift_id: &str) -> StationResult<Option<SalesMismatch>> {
        self.mismatches.for_shift(shift_id).await
    }

    /// Mismatches of a station, optionally filtered by resolution state
    pub async fn get_sales_mismatches(
        &self,
        station_id: &str,
        resolved: Option<bool>,
    ) -> StationResult<Vec<SalesMismatch>> {
        self.mismatches.list(station_id, resolved).await
    }

    // Payroll operations
    /// Salary for shifts starting in `[start, end)`
    pub async fn calculate_employee_salary(
        &self,
        employee_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StationResult<SalaryStatement> {
        self.salaries.calculate(employee_id, start, end).await
    }

    // Reporting operations
    /// Generate (or regenerate) a station report
    pub async fn generate_financial_report(
        &self,
        station_id: &str,
        report_type: ReportType,
        report_date: NaiveDate,
    ) -> StationResult<FinancialReport> {
        let report = self
            .reports
            .generate(station_id, report_type, report_date)
            .await?;
        self.emit(
            ActivityAction::ReportGenerated,
            None,
            Some(station_id),
            &report.id,
            format!("{} report for {} generated", report.report_type, report.report_date),
        )
        .await;
        Ok(report)
    }

    /// Like `generate_financial_report`, taking the report type by name.
    ///
    /// Unknown names fail with `InvalidReportType`.
    pub async fn generate_financial_report_named(
        &self,
        station_id: &str,
        report_type: &str,
        report_date: NaiveDate,
    ) -> StationResult<FinancialReport> {
        let report_type: ReportType = report_type.parse()?;
        self.generate_financial_report(station_id, report_type, report_date)
            .await
    }

    /// Stored reports of a station
    pub async fn get_financial_reports(
        &self,
        station_id: &str,
        report_type: Option<ReportType>,
        date_range: Option<DateRange>,
    ) -> StationResult<Vec<FinancialReport>> {
        self.reports.list(station_id, report_type, date_range).await
    }

    async fn emit(
        &self,
        action: ActivityAction,
        actor_id: Option<&str>,
        station_id: Option<&str>,
        subject_id: &str,
        description: String,
    ) {
        let event = ActivityEvent {
            action,
            actor_id: actor_id.map(str::to_string),
            station_id: station_id.map(str::to_string),
            subject_id: subject_id.to_string(),
            description,
            occurred_at: self.clock.now(),
        };

        if let Err(e) = self.activity.record(&event).await {
            tracing::warn!(action = ?action, subject_id, error = %e, "activity log write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ActivityEvent>>,
    }

    #[async_trait]
    impl ActivitySink for RecordingSink {
        async fn record(&self, event: &ActivityEvent) -> StationResult<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl ActivitySink for BrokenSink {
        async fn record(&self, _event: &ActivityEvent) -> StationResult<()> {
            Err(StationError::Dependency("audit log unreachable".to_string()))
        }
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn clock() -> Arc<dyn Clock> {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Arc::new(FixedClock(now))
    }

    fn request() -> NewShift {
        NewShift {
            station_id: "st-1".to_string(),
            employee_id: "emp-1".to_string(),
            dispenser_ids: vec!["pump-1".to_string()],
            starting_cash: dec("50"),
            opening_readings: vec![OpeningReading {
                dispenser_id: "pump-1".to_string(),
                fuel_type: "Petrol".to_string(),
                start_reading: dec("100"),
            }],
        }
    }

    #[tokio::test]
    async fn test_operations_emit_activity_events() {
        let storage = MemoryStorage::new();
        storage
            .set_fuel_price(FuelPrice::new("st-1".to_string(), "Petrol".to_string(), dec("2")).unwrap())
            .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let core =
            StationCore::with_config(storage, CoreConfig::default(), clock(), sink.clone()).unwrap();

        let opened = core.start_shift(request()).await.unwrap();
        let closing = vec![ClosingReading {
            reading_id: opened.readings[0].id.clone(),
            end_reading: dec("110"),
        }];
        core.close_shift(&opened.shift.id, dec("70"), closing).await.unwrap();
        let outcome = core.calculate_sales_mismatch(&opened.shift.id).await.unwrap();
        core.resolve_sales_mismatch(&outcome.mismatch.id, "mgr-1", "No sales posted")
            .await
            .unwrap();

        let actions: Vec<ActivityAction> =
            sink.events.lock().unwrap().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                ActivityAction::ShiftStarted,
                ActivityAction::ShiftClosed,
                ActivityAction::MismatchCalculated,
                ActivityAction::MismatchResolved,
            ]
        );
    }

    #[tokio::test]
    async fn test_shift_lookups_after_reconciliation() {
        let storage = MemoryStorage::new();
        storage
            .set_fuel_price(FuelPrice::new("st-1".to_string(), "Petrol".to_string(), dec("2")).unwrap())
            .unwrap();
        let core = StationCore::with_config(
            storage,
            CoreConfig::default(),
            clock(),
            Arc::new(TracingActivitySink),
        )
        .unwrap();

        let opened = core.start_shift(request()).await.unwrap();
        let err = core.shift_volumes(&opened.shift.id).await.unwrap_err();
        assert!(matches!(err, StationError::ShiftNotClosed(_)));
        assert!(core
            .get_shift_mismatch(&opened.shift.id)
            .await
            .unwrap()
            .is_none());

        let closing = vec![ClosingReading {
            reading_id: opened.readings[0].id.clone(),
            end_reading: dec("112.5"),
        }];
        core.close_shift(&opened.shift.id, dec("50"), closing).await.unwrap();

        let volumes = core.shift_volumes(&opened.shift.id).await.unwrap();
        assert_eq!(volumes.get("Petrol"), Some(&dec("12.5")));

        let outcome = core.calculate_sales_mismatch(&opened.shift.id).await.unwrap();
        let recorded = core
            .get_shift_mismatch(&opened.shift.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recorded.id, outcome.mismatch.id);
        assert_eq!(recorded.expected_amount(), &dec("25.00"));
    }

    #[tokio::test]
    async fn test_report_by_name() {
        let core = StationCore::with_config(
            MemoryStorage::new(),
            CoreConfig::default(),
            clock(),
            Arc::new(TracingActivitySink),
        )
        .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();

        let report = core
            .generate_financial_report_named("st-1", "Weekly", day)
            .await
            .unwrap();
        assert_eq!(report.report_type, ReportType::Weekly);
        assert_eq!(report.report_date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());

        let err = core
            .generate_financial_report_named("st-1", "quarterly", day)
            .await
            .unwrap_err();
        assert!(matches!(err, StationError::InvalidReportType(_)));
        let stored = core.get_financial_reports("st-1", None, None).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_activity_failure_does_not_fail_operation() {
        let core = StationCore::with_config(
            MemoryStorage::new(),
            CoreConfig::default(),
            clock(),
            Arc::new(BrokenSink),
        )
        .unwrap();

        let opened = core.start_shift(request()).await.unwrap();
        assert!(core.get_shift(&opened.shift.id).await.unwrap().is_some());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CoreConfig {
            amount_scale: -1,
            ..CoreConfig::default()
        };
        let result = StationCore::with_config(
            MemoryStorage::new(),
            config,
            clock(),
            Arc::new(TracingActivitySink),
        );
        assert!(result.is_err());
    }
}
