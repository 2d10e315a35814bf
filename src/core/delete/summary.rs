//! Delete summary and reporting

use crate::domain::ExportDate;
use std::time::Duration;

/// Summary of propagating one export date's deletions
#[derive(Debug, Clone)]
pub struct DeleteSummary {
    /// Export date processed
    pub date: ExportDate,

    /// Audit records read
    pub records_read: usize,

    /// Audit records malformed or naming an untracked collection
    pub records_skipped: usize,

    /// Remote rows deleted (or that would be deleted in dry-run mode)
    pub remote_deleted: usize,

    /// Remote deletes answered with not-found
    pub remote_not_found: usize,

    /// Catalogue records whose remote delete was skipped
    pub remote_skipped: usize,

    /// Documents removed from the store
    pub local_deleted: usize,

    /// Whether the date is the full export, which carries no audit file
    pub full_export: bool,

    /// Whether remote and local deletes were skipped
    pub dry_run: bool,

    /// Duration of the run
    pub duration: Duration,
}

impl DeleteSummary {
    /// Create a new empty summary
    pub fn new(date: ExportDate) -> Self {
        Self {
            date,
            records_read: 0,
            records_skipped: 0,
            remote_deleted: 0,
            remote_not_found: 0,
            remote_skipped: 0,
            local_deleted: 0,
            full_export: false,
            dry_run: false,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            date = %self.date,
            records_read = self.records_read,
            records_skipped = self.records_skipped,
            remote_deleted = self.remote_deleted,
            remote_not_found = self.remote_not_found,
            remote_skipped = self.remote_skipped,
            local_deleted = self.local_deleted,
            full_export = self.full_export,
            dry_run = self.dry_run,
            duration_secs = self.duration.as_secs(),
            "Delete propagation completed"
        );
    }
}
