//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Tables {
    shifts: HashMap<String, Shift>,
    readings: HashMap<String, MeterReading>,
    transactions: HashMap<String, Transaction>,
    expenses: HashMap<String, Expense>,
    prices: HashMap<(String, String), FuelPrice>,
    employees: HashMap<String, Employee>,
    mismatches: HashMap<String, SalesMismatch>,
    // unique index: shift id -> mismatch id
    mismatch_by_shift: HashMap<String, String>,
    reports: HashMap<ReportKey, FinancialReport>,
}

/// In-memory storage implementation for testing and development.
///
/// All tables sit behind one lock, so every trait method is a single atomic
/// unit of work and the uniqueness rules hold under concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an employee profile
    pub fn add_employee(&self, employee: Employee) -> StationResult<()> {
        self.write()?.employees.insert(employee.id.clone(), employee);
        Ok(())
    }

    /// Set the current price of a fuel type
    pub fn set_fuel_price(&self, price: FuelPrice) -> StationResult<()> {
        self.write()?.prices.insert(
            (price.station_id.clone(), price.fuel_type.clone()),
            price,
        );
        Ok(())
    }

    /// Simulate the store becoming unreachable; every call then fails with
    /// `StationError::Dependency`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> StationResult<()> {
        *self.write()? = Tables::default();
        Ok(())
    }

    fn ensure_online(&self) -> StationResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StationError::Dependency(
                "memory storage is offline".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> StationResult<RwLockReadGuard<'_, Tables>> {
        self.ensure_online()?;
        self.tables
            .read()
            .map_err(|_| StationError::Dependency("memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> StationResult<RwLockWriteGuard<'_, Tables>> {
        self.ensure_online()?;
        self.tables
            .write()
            .map_err(|_| StationError::Dependency("memory storage lock poisoned".to_string()))
    }
}

fn ensure_readings_belong(shift: &Shift, readings: &[MeterReading]) -> StationResult<()> {
    match readings.iter().find(|r| r.shift_id != shift.id) {
        Some(stray) => Err(StationError::Validation(format!(
            "Meter reading '{}' does not belong to shift '{}'",
            stray.id, shift.id
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl StationStorage for MemoryStorage {
    async fn insert_shift(&self, shift: &Shift, readings: &[MeterReading]) -> StationResult<()> {
        ensure_readings_belong(shift, readings)?;
        let mut tables = self.write()?;

        if tables.shifts.contains_key(&shift.id) {
            return Err(StationError::DuplicateKey(format!("shift '{}'", shift.id)));
        }
        if shift.is_active()
            && tables
                .shifts
                .values()
                .any(|s| s.employee_id == shift.employee_id && s.is_active())
        {
            return Err(StationError::ActiveShiftExists(shift.employee_id.clone()));
        }

        tables.shifts.insert(shift.id.clone(), shift.clone());
        for reading in readings {
            tables.readings.insert(reading.id.clone(), reading.clone());
        }
        Ok(())
    }

    async fn update_shift(&self, shift: &Shift, readings: &[MeterReading]) -> StationResult<()> {
        ensure_readings_belong(shift, readings)?;
        let mut tables = self.write()?;

        match tables.shifts.get(&shift.id) {
            None => return Err(StationError::ShiftNotFound(shift.id.clone())),
            Some(stored) if !stored.is_active() => {
                return Err(StationError::InvalidShiftState {
                    shift_id: shift.id.clone(),
                    reason: format!("shift is already {:?}", stored.status),
                })
            }
            Some(_) => {}
        }

        tables.shifts.insert(shift.id.clone(), shift.clone());
        for reading in readings {
            tables.readings.insert(reading.id.clone(), reading.clone());
        }
        Ok(())
    }

    async fn get_shift(&self, shift_id: &str) -> StationResult<Option<Shift>> {
        Ok(self.read()?.shifts.get(shift_id).cloned())
    }

    async fn find_active_shift(&self, employee_id: &str) -> StationResult<Option<Shift>> {
        Ok(self
            .read()?
            .shifts
            .values()
            .find(|s| s.employee_id == employee_id && s.is_active())
            .cloned())
    }

    async fn list_employee_shifts(
        &self,
        employee_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StationResult<Vec<Shift>> {
        let tables = self.read()?;
        let mut shifts: Vec<Shift> = tables
            .shifts
            .values()
            .filter(|s| s.employee_id == employee_id)
            .filter(|s| s.start_time >= start && s.start_time < end)
            .cloned()
            .collect();
        shifts.sort_by_key(|s| s.start_time);
        Ok(shifts)
    }

    async fn get_meter_readings(&self, shift_id: &str) -> StationResult<Vec<MeterReading>> {
        let tables = self.read()?;
        let mut readings: Vec<MeterReading> = tables
            .readings
            .values()
            .filter(|r| r.shift_id == shift_id)
            .cloned()
            .collect();
        readings.sort_by(|a, b| {
            (&a.dispenser_id, &a.fuel_type).cmp(&(&b.dispenser_id, &b.fuel_type))
        });
        Ok(readings)
    }

    async fn save_transaction(&self, transaction: &Transaction) -> StationResult<()> {
        let mut tables = self.write()?;
        if tables.transactions.contains_key(&transaction.id) {
            return Err(StationError::DuplicateKey(format!(
                "transaction '{}'",
                transaction.id
            )));
        }
        tables
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    async fn get_shift_transactions(&self, shift_id: &str) -> StationResult<Vec<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .values()
            .filter(|t| t.shift_id == shift_id)
            .cloned()
            .collect())
    }

    async fn get_station_transactions(
        &self,
        station_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StationResult<Vec<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .values()
            .filter(|t| t.station_id == station_id)
            .filter(|t| {
                let date = t.created_at.date();
                date >= start && date < end
            })
            .cloned()
            .collect())
    }

    async fn save_expense(&self, expense: &Expense) -> StationResult<()> {
        let mut tables = self.write()?;
        if tables.expenses.contains_key(&expense.id) {
            return Err(StationError::DuplicateKey(format!("expense '{}'", expense.id)));
        }
        tables.expenses.insert(expense.id.clone(), expense.clone());
        Ok(())
    }

    async fn get_station_expenses(
        &self,
        station_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StationResult<Vec<Expense>> {
        Ok(self
            .read()?
            .expenses
            .values()
            .filter(|e| e.station_id == station_id && e.date >= start && e.date < end)
            .cloned()
            .collect())
    }

    async fn get_fuel_price(
        &self,
        station_id: &str,
        fuel_type: &str,
    ) -> StationResult<Option<FuelPrice>> {
        Ok(self
            .read()?
            .prices
            .get(&(station_id.to_string(), fuel_type.to_string()))
            .cloned())
    }

    async fn get_employee(&self, employee_id: &str) -> StationResult<Option<Employee>> {
        Ok(self.read()?.employees.get(employee_id).cloned())
    }

    async fn insert_mismatch(&self, mismatch: &SalesMismatch) -> StationResult<()> {
        let mut tables = self.write()?;

        if tables.mismatch_by_shift.contains_key(&mismatch.shift_id) {
            return Err(StationError::DuplicateKey(format!(
                "sales mismatch for shift '{}'",
                mismatch.shift_id
            )));
        }
        if tables.mismatches.contains_key(&mismatch.id) {
            return Err(StationError::DuplicateKey(format!(
                "sales mismatch '{}'",
                mismatch.id
            )));
        }

        tables
            .mismatch_by_shift
            .insert(mismatch.shift_id.clone(), mismatch.id.clone());
        tables
            .mismatches
            .insert(mismatch.id.clone(), mismatch.clone());
        Ok(())
    }

    async fn store_resolution(&self, mismatch: &SalesMismatch) -> StationResult<()> {
        let mut tables = self.write()?;

        match tables.mismatches.get(&mismatch.id) {
            None => return Err(StationError::MismatchNotFound(mismatch.id.clone())),
            Some(stored) if stored.is_resolved() => {
                return Err(StationError::AlreadyResolved(mismatch.id.clone()))
            }
            Some(_) => {}
        }

        tables
            .mismatches
            .insert(mismatch.id.clone(), mismatch.clone());
        Ok(())
    }

    async fn get_mismatch(&self, mismatch_id: &str) -> StationResult<Option<SalesMismatch>> {
        Ok(self.read()?.mismatches.get(mismatch_id).cloned())
    }

    async fn get_shift_mismatch(&self, shift_id: &str) -> StationResult<Option<SalesMismatch>> {
        let tables = self.read()?;
        Ok(tables
            .mismatch_by_shift
            .get(shift_id)
            .and_then(|id| tables.mismatches.get(id))
            .cloned())
    }

    async fn list_mismatches(
        &self,
        station_id: &str,
        resolved: Option<bool>,
    ) -> StationResult<Vec<SalesMismatch>> {
        let tables = self.read()?;
        let station_shifts: HashSet<&str> = tables
            .shifts
            .values()
            .filter(|s| s.station_id == station_id)
            .map(|s| s.id.as_str())
            .collect();

        let mut mismatches: Vec<SalesMismatch> = tables
            .mismatches
            .values()
            .filter(|m| station_shifts.contains(m.shift_id.as_str()))
            .filter(|m| resolved.is_none_or(|r| m.is_resolved() == r))
            .cloned()
            .collect();
        mismatches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(mismatches)
    }

    async fn upsert_report(&self, report: FinancialReport) -> StationResult<FinancialReport> {
        let mut tables = self.write()?;
        let key = report.key();

        let stored = match tables.reports.get(&key) {
            Some(prior) => report.replacing(prior),
            None => report,
        };
        tables.reports.insert(key, stored.clone());
        Ok(stored)
    }

    async fn list_reports(
        &self,
        station_id: &str,
        report_type: Option<ReportType>,
        date_range: Option<DateRange>,
    ) -> StationResult<Vec<FinancialReport>> {
        let tables = self.read()?;
        let mut reports: Vec<FinancialReport> = tables
            .reports
            .values()
            .filter(|r| r.station_id == station_id)
            .filter(|r| report_type.is_none_or(|t| r.report_type == t))
            .filter(|r| date_range.is_none_or(|range| range.contains(r.report_date)))
            .cloned()
            .collect();
        reports.sort_by(|a, b| {
            a.report_date
                .cmp(&b.report_date)
                .then_with(|| a.report_type.as_str().cmp(b.report_type.as_str()))
        });
        Ok(reports)
    }
}
