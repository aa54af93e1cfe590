//! Flat hourly salary calculation

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::CoreConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::money::{round_amount, sum_amounts};

/// Pay owed to an employee for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryStatement {
    pub employee_id: String,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub hourly_rate: BigDecimal,
    /// Paid hours, rounded to four places for display
    pub total_hours: BigDecimal,
    /// Shifts that counted towards pay
    pub shift_count: usize,
    /// Paid shifts that were still open and measured against the clock
    pub open_shift_count: usize,
    pub salary: BigDecimal,
}

/// Hours in a duration, at second resolution
pub fn hours_worked(duration: Duration) -> BigDecimal {
    BigDecimal::from(duration.num_seconds()) / BigDecimal::from(3600)
}

/// `Σ hours × rate`, rounded to `scale` places
pub fn compute_salary(hours: &[BigDecimal], hourly_rate: &BigDecimal, scale: i64) -> BigDecimal {
    round_amount(&(sum_amounts(hours) * hourly_rate), scale)
}

/// Derives employee pay from worked shift time
pub struct SalaryCalculator<S: StationStorage> {
    storage: S,
    clock: Arc<dyn Clock>,
    config: CoreConfig,
}

impl<S: StationStorage> SalaryCalculator<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>, config: CoreConfig) -> Self {
        Self {
            storage,
            clock,
            config,
        }
    }

    /// Salary for shifts starting in `[start, end)`.
    ///
    /// Open shifts are measured up to the current instant when
    /// `include_open_shifts_in_salary` is set, so the figure grows until they
    /// close. Cancelled shifts are never paid.
    pub async fn calculate(
        &self,
        employee_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StationResult<SalaryStatement> {
        if end <= start {
            return Err(StationError::Validation(format!(
                "Salary period end {} must be after start {}",
                end, start
            )));
        }

        let employee = self
            .storage
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| StationError::EmployeeNotFound(employee_id.to_string()))?;

        let shifts = self
            .storage
            .list_employee_shifts(employee_id, start, end)
            .await?;

        let now = self.clock.now();
        let mut hours = Vec::with_capacity(shifts.len());
        let mut open_shift_count = 0;
        for shift in &shifts {
            match shift.status {
                ShiftStatus::Cancelled => continue,
                ShiftStatus::Active if !self.config.include_open_shifts_in_salary => continue,
                ShiftStatus::Active => open_shift_count += 1,
                ShiftStatus::Completed => {}
            }
            hours.push(hours_worked(shift.worked_duration(now)));
        }

        let salary = compute_salary(&hours, &employee.hourly_rate, self.config.amount_scale);
        let total_hours = round_amount(&sum_amounts(&hours), 4);

        tracing::debug!(
            employee_id,
            shifts = hours.len(),
            open_shifts = open_shift_count,
            total_hours = %total_hours,
            salary = %salary,
            "salary calculated"
        );

        Ok(SalaryStatement {
            employee_id: employee.id,
            period_start: start,
            period_end: end,
            hourly_rate: employee.hourly_rate,
            total_hours,
            shift_count: hours.len(),
            open_shift_count,
            salary,
        })
    }
}
