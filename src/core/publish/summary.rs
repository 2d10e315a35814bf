//! Publish summary and reporting

use crate::config::WriteTarget;
use crate::datasets::DatasetVariant;
use crate::domain::{ExportDate, ResourceId};
use std::time::Duration;

/// Summary of publishing one dataset
#[derive(Debug, Clone)]
pub struct PublishSummary {
    /// Dataset variant published
    pub variant: DatasetVariant,

    /// Export date restricting the run, if any
    pub date: Option<ExportDate>,

    /// Remote resource written to
    pub resource_id: Option<ResourceId>,

    /// Write target used
    pub target: WriteTarget,

    /// Number of batches pulled from the store
    pub batches: usize,

    /// Number of rows extracted
    pub rows_extracted: usize,

    /// Number of rows written
    pub rows_written: usize,

    /// Rows dropped for lacking a primary key value
    pub rows_skipped: usize,

    /// Whether remote and file writes were skipped
    pub dry_run: bool,

    /// Whether a shutdown signal stopped the run early
    pub interrupted: bool,

    /// Duration of the run
    pub duration: Duration,
}

impl PublishSummary {
    /// Create a new empty summary
    pub fn new(variant: DatasetVariant, date: Option<ExportDate>, target: WriteTarget) -> Self {
        Self {
            variant,
            date,
            resource_id: None,
            target,
            batches: 0,
            rows_extracted: 0,
            rows_written: 0,
            rows_skipped: 0,
            dry_run: false,
            interrupted: false,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Rows per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.rows_written as f64 / secs
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            dataset = %self.variant,
            date = ?self.date.map(|d| d.value()),
            resource_id = ?self.resource_id.as_ref().map(ResourceId::as_str),
            target = ?self.target,
            batches = self.batches,
            rows_extracted = self.rows_extracted,
            rows_written = self.rows_written,
            rows_skipped = self.rows_skipped,
            dry_run = self.dry_run,
            interrupted = self.interrupted,
            duration_secs = self.duration.as_secs(),
            rows_per_sec = format!("{:.1}", self.throughput()),
            "Publish completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_summary_creation() {
        let summary = PublishSummary::new(DatasetVariant::Specimen, None, WriteTarget::Api);
        assert_eq!(summary.batches, 0);
        assert_eq!(summary.rows_written, 0);
        assert_eq!(summary.rows_skipped, 0);
        assert!(summary.resource_id.is_none());
        assert_eq!(summary.duration, Duration::from_secs(0));
    }

    #[test]
    fn test_throughput() {
        let mut summary = PublishSummary::new(DatasetVariant::Artefact, None, WriteTarget::Csv)
            .with_duration(Duration::from_secs(4));
        summary.rows_written = 1000;
        assert_eq!(summary.throughput(), 250.0);

        summary.duration = Duration::from_secs(0);
        assert_eq!(summary.throughput(), 0.0);
    }
}
