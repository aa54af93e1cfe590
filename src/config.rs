//! Runtime configuration for the station core

use chrono::Weekday;
use serde::Deserialize;

use crate::types::*;

/// Policies shared by the calculators
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Decimal places kept on computed money figures (expected sales, salary)
    pub amount_scale: i64,
    /// Whether an in-progress shift is paid up to the current instant
    pub include_open_shifts_in_salary: bool,
    /// First day of a weekly report window
    pub week_start: Weekday,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            amount_scale: 2,
            include_open_shifts_in_salary: true,
            week_start: Weekday::Mon,
        }
    }
}

impl CoreConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> StationResult<Self> {
        let config: CoreConfig = serde_json::from_str(json)
            .map_err(|e| StationError::Validation(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StationResult<()> {
        if !(0..=8).contains(&self.amount_scale) {
            return Err(StationError::Validation(format!(
                "amount_scale must be between 0 and 8, got {}",
                self.amount_scale
            )));
        }
        Ok(())
    }
}
