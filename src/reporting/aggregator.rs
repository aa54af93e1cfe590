//! Financial report generation from sales and expense records

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::config::CoreConfig;
use crate::reporting::ReportPeriod;
use crate::traits::*;
use crate::types::*;
use crate::utils::money::sum_amounts;

/// Sales and expense totals, summed independently
pub fn summarize(transactions: &[Transaction], expenses: &[Expense]) -> (BigDecimal, BigDecimal) {
    let sales = sum_amounts(transactions.iter().map(|t| &t.total_amount));
    let spent = sum_amounts(expenses.iter().map(|e| &e.amount));
    (sales, spent)
}

/// Rolls transactions and expenses of a station into persisted reports
pub struct ReportAggregator<S: StationStorage> {
    storage: S,
    config: CoreConfig,
}

impl<S: StationStorage> ReportAggregator<S> {
    pub fn new(storage: S, config: CoreConfig) -> Self {
        Self { storage, config }
    }

    /// Generate and store the report whose window contains `report_date`.
    ///
    /// Reports are upserted by station, type and window start, so
    /// regenerating overwrites the figures of the existing row.
    pub async fn generate(
        &self,
        station_id: &str,
        report_type: ReportType,
        report_date: NaiveDate,
    ) -> StationResult<FinancialReport> {
        let period = ReportPeriod::containing(report_type, report_date, self.config.week_start)?;

        let transactions = self
            .storage
            .get_station_transactions(station_id, period.start, period.end)
            .await?;
        let expenses = self
            .storage
            .get_station_expenses(station_id, period.start, period.end)
            .await?;

        let (sales, spent) = summarize(&transactions, &expenses);
        let report = FinancialReport::new(
            station_id.to_string(),
            report_type,
            period.start,
            sales,
            spent,
        );
        let stored = self.storage.upsert_report(report).await?;

        tracing::info!(
            station_id,
            report_type = %report_type,
            report_date = %stored.report_date,
            transactions = transactions.len(),
            expenses = expenses.len(),
            profit = %stored.profit_amount(),
            "financial report generated"
        );

        Ok(stored)
    }

    /// Like `generate`, taking the report type as text
    pub async fn generate_named(
        &self,
        station_id: &str,
        report_type: &str,
        report_date: NaiveDate,
    ) -> StationResult<FinancialReport> {
        let report_type: ReportType = report_type.parse()?;
        self.generate(station_id, report_type, report_date).await
    }

    /// Stored reports of a station, oldest first
    pub async fn list(
        &self,
        station_id: &str,
        report_type: Option<ReportType>,
        date_range: Option<DateRange>,
    ) -> StationResult<Vec<FinancialReport>> {
        self.storage
            .list_reports(station_id, report_type, date_range)
            .await
    }
}
