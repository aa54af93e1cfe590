//! Meter reading store

use bigdecimal::BigDecimal;
use std::collections::BTreeMap;

use crate::traits::*;
use crate::types::*;

/// Read access to the meter readings of shifts
pub struct MeterReadingBook<S: StationStorage> {
    storage: S,
}

impl<S: StationStorage> MeterReadingBook<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// All readings of a shift, open or closed
    pub async fn readings(&self, shift_id: &str) -> StationResult<Vec<MeterReading>> {
        self.storage.get_meter_readings(shift_id).await
    }

    /// Readings of a shift, failing with `ShiftNotClosed` unless every one of
    /// them carries a closing value
    pub async fn closed_readings(&self, shift_id: &str) -> StationResult<Vec<MeterReading>> {
        let readings = self.storage.get_meter_readings(shift_id).await?;
        Self::ensure_closed(shift_id, &readings)?;
        Ok(readings)
    }

    pub fn ensure_closed(shift_id: &str, readings: &[MeterReading]) -> StationResult<()> {
        if let Some(open) = readings.iter().find(|r| !r.is_closed()) {
            tracing::debug!(
                shift_id,
                reading_id = %open.id,
                dispenser_id = %open.dispenser_id,
                "meter reading has no closing value"
            );
            return Err(StationError::ShiftNotClosed(shift_id.to_string()));
        }
        Ok(())
    }

    /// Dispensed volume per fuel type across closed readings
    pub fn volume_by_fuel(readings: &[MeterReading]) -> StationResult<BTreeMap<String, BigDecimal>> {
        let mut totals: BTreeMap<String, BigDecimal> = BTreeMap::new();
        for reading in readings {
            let volume = reading.volume()?;
            *totals
                .entry(reading.fuel_type.clone())
                .or_insert_with(|| BigDecimal::from(0)) += volume;
        }
        Ok(totals)
    }
}
