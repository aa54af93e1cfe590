//! Expected-versus-actual sales reconciliation for a closed shift

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::ledger::MeterReadingBook;
use crate::traits::*;
use crate::types::*;
use crate::utils::money::{round_amount, sum_amounts};

/// Priced contribution of one meter reading to expected sales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationLine {
    pub reading_id: String,
    pub dispenser_id: String,
    pub fuel_type: String,
    pub volume: BigDecimal,
    pub unit_price: BigDecimal,
    /// `volume * unit_price`, unrounded
    pub amount: BigDecimal,
}

/// Conditions that did not stop the reconciliation but make it partial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconciliationWarning {
    /// No current price for the fuel; the reading is left out of expected sales
    PriceUnavailable {
        reading_id: String,
        dispenser_id: String,
        fuel_type: String,
    },
}

/// Mismatch record plus the figures it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub mismatch: SalesMismatch,
    pub lines: Vec<ReconciliationLine>,
    pub warnings: Vec<ReconciliationWarning>,
}

impl ReconciliationOutcome {
    /// True when some readings were left out for lack of a price
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Price a closed reading
pub fn price_line(reading: &MeterReading, price: &FuelPrice) -> StationResult<ReconciliationLine> {
    let volume = reading.volume()?;
    let amount = &volume * &price.price_per_unit;
    Ok(ReconciliationLine {
        reading_id: reading.id.clone(),
        dispenser_id: reading.dispenser_id.clone(),
        fuel_type: reading.fuel_type.clone(),
        volume,
        unit_price: price.price_per_unit.clone(),
        amount,
    })
}

/// Sum of line amounts, rounded to `scale` places
pub fn expected_sales(lines: &[ReconciliationLine], scale: i64) -> BigDecimal {
    round_amount(&sum_amounts(lines.iter().map(|l| &l.amount)), scale)
}

/// Sum of recorded sale totals
pub fn actual_sales(transactions: &[Transaction]) -> BigDecimal {
    sum_amounts(transactions.iter().map(|t| &t.total_amount))
}

/// Computes and records the sales mismatch of a shift
pub struct ReconciliationCalculator<S: StationStorage> {
    storage: S,
    meters: MeterReadingBook<S>,
    config: CoreConfig,
}

impl<S: StationStorage + Clone> ReconciliationCalculator<S> {
    pub fn new(storage: S, config: CoreConfig) -> Self {
        Self {
            meters: MeterReadingBook::new(storage.clone()),
            storage,
            config,
        }
    }

    /// Reconcile a closed shift and record the mismatch.
    ///
    /// At most one mismatch exists per shift: any later call for the same
    /// shift fails with `MismatchAlreadyExists`, including a call that loses
    /// a concurrent race at the storage boundary.
    pub async fn calculate(&self, shift_id: &str) -> StationResult<ReconciliationOutcome> {
        if self.storage.get_shift_mismatch(shift_id).await?.is_some() {
            return Err(StationError::MismatchAlreadyExists(shift_id.to_string()));
        }

        let outcome = self.preview(shift_id).await?;

        match self.storage.insert_mismatch(&outcome.mismatch).await {
            Ok(()) => {}
            Err(StationError::DuplicateKey(_)) => {
                tracing::debug!(shift_id, "lost mismatch insert race");
                return Err(StationError::MismatchAlreadyExists(shift_id.to_string()));
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            shift_id,
            mismatch_id = %outcome.mismatch.id,
            expected = %outcome.mismatch.expected_amount(),
            actual = %outcome.mismatch.actual_amount(),
            mismatch = %outcome.mismatch.mismatch_amount(),
            partial = outcome.is_partial(),
            "sales mismatch recorded"
        );

        Ok(outcome)
    }

    /// Compute the reconciliation of a closed shift without recording it
    pub async fn preview(&self, shift_id: &str) -> StationResult<ReconciliationOutcome> {
        let shift = self
            .storage
            .get_shift(shift_id)
            .await?
            .ok_or_else(|| StationError::ShiftNotFound(shift_id.to_string()))?;

        match shift.status {
            ShiftStatus::Active => return Err(StationError::ShiftNotClosed(shift.id)),
            ShiftStatus::Cancelled => {
                return Err(StationError::InvalidShiftState {
                    shift_id: shift.id,
                    reason: "cannot reconcile a cancelled shift".to_string(),
                })
            }
            ShiftStatus::Completed => {}
        }

        let readings = self.meters.closed_readings(shift_id).await?;

        let mut lines = Vec::with_capacity(readings.len());
        let mut warnings = Vec::new();
        for reading in &readings {
            // Validate the delta before the price lookup so corrupt counters
            // surface even when the fuel has no price
            reading.volume()?;

            match self
                .storage
                .get_fuel_price(&shift.station_id, &reading.fuel_type)
                .await?
            {
                Some(price) => lines.push(price_line(reading, &price)?),
                None => {
                    tracing::warn!(
                        shift_id,
                        station_id = %shift.station_id,
                        fuel_type = %reading.fuel_type,
                        dispenser_id = %reading.dispenser_id,
                        "no fuel price, reading excluded from expected sales"
                    );
                    warnings.push(ReconciliationWarning::PriceUnavailable {
                        reading_id: reading.id.clone(),
                        dispenser_id: reading.dispenser_id.clone(),
                        fuel_type: reading.fuel_type.clone(),
                    });
                }
            }
        }

        let transactions = self.storage.get_shift_transactions(shift_id).await?;
        let expected = expected_sales(&lines, self.config.amount_scale);
        let actual = actual_sales(&transactions);

        Ok(ReconciliationOutcome {
            mismatch: SalesMismatch::new(shift.id, expected, actual),
            lines,
            warnings,
        })
    }
}
