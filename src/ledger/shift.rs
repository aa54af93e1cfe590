//! Shift management: opening, closing and cancelling shifts

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::*;
use crate::types::*;

/// A shift together with its meter readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSnapshot {
    pub shift: Shift,
    pub readings: Vec<MeterReading>,
}

/// Shift manager for the shift-start and shift-end operations
pub struct ShiftManager<S: StationStorage> {
    pub(crate) storage: S,
    validator: Box<dyn ShiftValidator>,
    clock: Arc<dyn Clock>,
}

impl<S: StationStorage> ShiftManager<S> {
    /// Create a new shift manager
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultShiftValidator),
            clock,
        }
    }

    /// Create a new shift manager with custom validator
    pub fn with_validator(
        storage: S,
        clock: Arc<dyn Clock>,
        validator: Box<dyn ShiftValidator>,
    ) -> Self {
        Self {
            storage,
            validator,
            clock,
        }
    }

    /// Open a shift and record its opening meter readings.
    ///
    /// An employee can hold only one active shift at a time.
    pub async fn start_shift(&self, request: NewShift) -> StationResult<ShiftSnapshot> {
        self.validator.validate_new_shift(&request)?;

        if let Some(active) = self.storage.find_active_shift(&request.employee_id).await? {
            tracing::debug!(
                employee_id = %request.employee_id,
                active_shift_id = %active.id,
                "refusing to open a second active shift"
            );
            return Err(StationError::ActiveShiftExists(request.employee_id));
        }

        let shift = Shift::new(
            request.station_id,
            request.employee_id,
            request.dispenser_ids,
            request.starting_cash,
            self.clock.now(),
        )?;

        let readings = request
            .opening_readings
            .into_iter()
            .map(|opening| {
                MeterReading::new(
                    shift.id.clone(),
                    opening.dispenser_id,
                    opening.fuel_type,
                    opening.start_reading,
                )
            })
            .collect::<StationResult<Vec<_>>>()?;

        // The store re-checks the active-shift rule atomically with the insert
        self.storage.insert_shift(&shift, &readings).await?;

        tracing::info!(
            shift_id = %shift.id,
            station_id = %shift.station_id,
            employee_id = %shift.employee_id,
            readings = readings.len(),
            "shift started"
        );

        Ok(ShiftSnapshot { shift, readings })
    }

    /// Close an active shift: every reading gets its closing value and the
    /// shift and readings are written as one unit of work.
    pub async fn close_shift(
        &self,
        shift_id: &str,
        ending_cash: BigDecimal,
        closing_readings: Vec<ClosingReading>,
    ) -> StationResult<ShiftSnapshot> {
        let mut shift = self.get_shift_required(shift_id).await?;
        if !shift.is_active() {
            return Err(StationError::InvalidShiftState {
                shift_id: shift.id.clone(),
                reason: format!("cannot close a {:?} shift", shift.status),
            });
        }

        let mut readings = self.storage.get_meter_readings(shift_id).await?;

        let mut closing: HashMap<String, BigDecimal> = HashMap::new();
        for entry in closing_readings {
            if !readings.iter().any(|r| r.id == entry.reading_id) {
                return Err(StationError::Validation(format!(
                    "Meter reading '{}' does not belong to shift '{}'",
                    entry.reading_id, shift_id
                )));
            }
            if closing
                .insert(entry.reading_id.clone(), entry.end_reading)
                .is_some()
            {
                return Err(StationError::Validation(format!(
                    "Duplicate closing value for meter reading '{}'",
                    entry.reading_id
                )));
            }
        }

        for reading in readings.iter_mut() {
            let end = closing.remove(&reading.id).ok_or_else(|| {
                StationError::Validation(format!(
                    "Missing closing value for dispenser '{}' ({})",
                    reading.dispenser_id, reading.fuel_type
                ))
            })?;
            reading.close(end)?;
        }

        shift.complete(ending_cash, self.clock.now())?;
        self.storage.update_shift(&shift, &readings).await?;

        tracing::info!(
            shift_id = %shift.id,
            station_id = %shift.station_id,
            readings = readings.len(),
            "shift closed"
        );

        Ok(ShiftSnapshot { shift, readings })
    }

    /// Cancel an active shift. Its readings stay open and it is never paid.
    pub async fn cancel_shift(&self, shift_id: &str) -> StationResult<Shift> {
        let mut shift = self.get_shift_required(shift_id).await?;
        shift.cancel(self.clock.now())?;
        self.storage.update_shift(&shift, &[]).await?;

        tracing::info!(shift_id = %shift.id, "shift cancelled");
        Ok(shift)
    }

    /// Get a shift by ID
    pub async fn get_shift(&self, shift_id: &str) -> StationResult<Option<Shift>> {
        self.storage.get_shift(shift_id).await
    }

    /// Get a shift by ID, returning an error if not found
    pub async fn get_shift_required(&self, shift_id: &str) -> StationResult<Shift> {
        self.storage
            .get_shift(shift_id)
            .await?
            .ok_or_else(|| StationError::ShiftNotFound(shift_id.to_string()))
    }

    /// The employee's active shift, if any
    pub async fn active_shift_for(&self, employee_id: &str) -> StationResult<Option<Shift>> {
        self.storage.find_active_shift(employee_id).await
    }
}
