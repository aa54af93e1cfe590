//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Validate that an identifier is present and reasonably sized
pub fn validate_id(label: &str, id: &str) -> StationResult<()> {
    if id.trim().is_empty() {
        return Err(StationError::Validation(format!("{} cannot be empty", label)));
    }

    if id.len() > 64 {
        return Err(StationError::Validation(format!(
            "{} cannot exceed 64 characters",
            label
        )));
    }

    Ok(())
}

/// Validate a free-text resolution note
pub fn validate_note(note: &str) -> StationResult<()> {
    if note.trim().is_empty() {
        return Err(StationError::Validation(
            "Resolution note cannot be empty".to_string(),
        ));
    }

    if note.len() > 1000 {
        return Err(StationError::Validation(
            "Resolution note cannot exceed 1000 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that an amount is not negative
pub fn validate_non_negative(label: &str, amount: &BigDecimal) -> StationResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(StationError::Validation(format!(
            "{} cannot be negative",
            label
        )))
    } else {
        Ok(())
    }
}
