//! Resolution workflow for flagged sales mismatches

use std::sync::Arc;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_id, validate_note};

/// Drives mismatches from `Unresolved` to `Resolved`.
///
/// There is no automatic resolution and no reopening.
pub struct MismatchWorkflow<S: StationStorage> {
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S: StationStorage> MismatchWorkflow<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Resolve a mismatch with the resolver's explanation.
    ///
    /// Only the resolution fields and `updated_at` change. A record resolved
    /// concurrently by someone else is reported as `AlreadyResolved`.
    pub async fn resolve(
        &self,
        mismatch_id: &str,
        resolver_id: &str,
        note: &str,
    ) -> StationResult<SalesMismatch> {
        validate_note(note)?;
        validate_id("Resolver ID", resolver_id)?;

        let mut mismatch = self.get_required(mismatch_id).await?;
        mismatch.resolve(resolver_id, note, self.clock.now())?;
        self.storage.store_resolution(&mismatch).await?;

        tracing::info!(
            mismatch_id,
            shift_id = %mismatch.shift_id,
            resolver_id,
            "sales mismatch resolved"
        );

        Ok(mismatch)
    }

    /// Get a mismatch by ID
    pub async fn get(&self, mismatch_id: &str) -> StationResult<Option<SalesMismatch>> {
        self.storage.get_mismatch(mismatch_id).await
    }

    /// Get a mismatch by ID, returning an error if not found
    pub async fn get_required(&self, mismatch_id: &str) -> StationResult<SalesMismatch> {
        self.storage
            .get_mismatch(mismatch_id)
            .await?
            .ok_or_else(|| StationError::MismatchNotFound(mismatch_id.to_string()))
    }

    /// The mismatch recorded for a shift, if reconciled
    pub async fn for_shift(&self, shift_id: &str) -> StationResult<Option<SalesMismatch>> {
        self.storage.get_shift_mismatch(shift_id).await
    }

    /// Mismatches of a station, newest first, optionally by resolution state
    pub async fn list(
        &self,
        station_id: &str,
        resolved: Option<bool>,
    ) -> StationResult<Vec<SalesMismatch>> {
        self.storage.list_mismatches(station_id, resolved).await
    }
}
