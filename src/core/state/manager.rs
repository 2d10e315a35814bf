//! State manager for completion markers
//!
//! This module provides the StateManager that reads and writes completion
//! markers and enforces the export-date ordering precondition: a date may
//! only be published once every earlier export has been fully ingested.

use crate::adapters::database::traits::{CompletionMarker, MarkerStore};
use crate::domain::{ExportDate, Result, SyncError};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Task id of the delete stage, the last ingestion stage of an export date
pub const DELETE_TASK_ID: &str = "delete";

/// State manager for completion markers
pub struct StateManager {
    /// Marker storage backend
    storage: Arc<dyn MarkerStore + Send + Sync>,
}

impl StateManager {
    /// Create a new StateManager with a marker storage backend
    ///
    /// # Arguments
    ///
    /// * `storage` - Marker storage implementation
    pub fn new_with_storage(storage: Arc<dyn MarkerStore + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Record that `task_id` finished for `date`
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub async fn mark_complete(
        &self,
        task_id: &str,
        date: ExportDate,
        dry_run: bool,
    ) -> Result<()> {
        tracing::info!(task_id, date = %date, "Marking task complete");
        self.storage.touch(task_id, date, dry_run).await
    }

    /// Whether a marker exists for `(task_id, date)`
    ///
    /// # Errors
    ///
    /// Returns an error if the marker store cannot be queried.
    pub async fn is_complete(&self, task_id: &str, date: ExportDate) -> Result<bool> {
        self.storage.exists(task_id, date).await
    }

    /// Dates of every export that has been fully ingested
    ///
    /// # Errors
    ///
    /// Returns an error if the marker store cannot be queried.
    pub async fn processed_dates(&self) -> Result<BTreeSet<ExportDate>> {
        self.storage.marker_dates(DELETE_TASK_ID).await
    }

    /// All markers, ordered by date
    ///
    /// # Errors
    ///
    /// Returns an error if the marker store cannot be queried.
    pub async fn get_all_markers(&self) -> Result<Vec<CompletionMarker>> {
        self.storage.all_markers().await
    }

    /// Ensure every export before `date` has been processed
    ///
    /// # Arguments
    ///
    /// * `export_dates` - Dates present in the export directory
    /// * `date` - Date about to be processed
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DateOrdering`] listing the outstanding dates.
    pub async fn ensure_export_date(
        &self,
        export_dates: &BTreeSet<ExportDate>,
        date: ExportDate,
    ) -> Result<()> {
        let processed = self.processed_dates().await?;
        check_export_ordering(export_dates, &processed, date)
    }
}

/// Compare export and marker dates strictly before `date`
///
/// The two sets must be equal. Export dates lacking a marker are reported
/// as missing; markers for dates with no export file are a state error.
///
/// # Errors
///
/// Returns [`SyncError::DateOrdering`] or [`SyncError::State`] when the sets differ.
pub fn check_export_ordering(
    export_dates: &BTreeSet<ExportDate>,
    processed: &BTreeSet<ExportDate>,
    date: ExportDate,
) -> Result<()> {
    let earlier_exports: BTreeSet<ExportDate> = export_dates.range(..date).copied().collect();
    let earlier_markers: BTreeSet<ExportDate> = processed.range(..date).copied().collect();

    let missing: Vec<u32> = earlier_exports
        .difference(&earlier_markers)
        .map(ExportDate::value)
        .collect();
    if !missing.is_empty() {
        return Err(SyncError::DateOrdering { missing });
    }

    let orphaned: Vec<u32> = earlier_markers
        .difference(&earlier_exports)
        .map(ExportDate::value)
        .collect();
    if !orphaned.is_empty() {
        return Err(SyncError::State(format!(
            "Completion markers have no export files: {orphaned:?}"
        )));
    }

    tracing::debug!(
        date = %date,
        earlier = earlier_exports.len(),
        "Export date ordering satisfied"
    );
    Ok(())
}
