//! Block extraction from the document store
//!
//! [`BatchExtractor`] walks the dataset's primary collection in ascending
//! `_id` order using keyset pagination, one block per query. Blocks are
//! disjoint and together cover every matching document exactly once.

use crate::adapters::database::traits::{DocumentStore, Selection};
use crate::core::extract::batch::Batch;
use crate::core::state::StateManager;
use crate::datasets::{DatasetDefinition, RecordTypeFilter, RECORD_TYPE_FIELD};
use crate::domain::{ExportDate, RecordId, Result};
use futures::stream::{self, Stream};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Field holding the record status of a catalogue record
pub const RECORD_STATUS_FIELD: &str = "SecRecordStatus";

/// Field holding the export date a document was ingested from
pub const EXPORT_DATE_FIELD: &str = "exportFileDate";

/// Lazy, finite sequence of batches for one dataset
pub struct BatchExtractor {
    store: Arc<dyn DocumentStore + Send + Sync>,
    definition: Arc<DatasetDefinition>,
    selection: Selection,
    last_id: Option<RecordId>,
    exhausted: bool,
    batches: usize,
    rows: usize,
}

impl BatchExtractor {
    /// Create an extractor over every matching document
    ///
    /// # Arguments
    ///
    /// * `store` - Document store to read from
    /// * `definition` - Dataset to extract
    /// * `record_status` - Required `SecRecordStatus` value
    /// * `date` - Restrict to documents ingested from this export
    pub fn new(
        store: Arc<dyn DocumentStore + Send + Sync>,
        definition: Arc<DatasetDefinition>,
        record_status: &str,
        date: Option<ExportDate>,
    ) -> Self {
        let selection = Self::selection_for(&definition, record_status, date);
        Self {
            store,
            definition,
            selection,
            last_id: None,
            exhausted: false,
            batches: 0,
            rows: 0,
        }
    }

    /// Create an extractor for one export date after checking that every
    /// earlier export has been processed
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DateOrdering`](crate::domain::SyncError::DateOrdering)
    /// if earlier exports are outstanding.
    pub async fn for_date(
        store: Arc<dyn DocumentStore + Send + Sync>,
        definition: Arc<DatasetDefinition>,
        record_status: &str,
        date: ExportDate,
        export_dates: &BTreeSet<ExportDate>,
        state: &StateManager,
    ) -> Result<Self> {
        state.ensure_export_date(export_dates, date).await?;
        Ok(Self::new(store, definition, record_status, Some(date)))
    }

    /// Selection applied to the primary collection
    pub fn selection_for(
        definition: &DatasetDefinition,
        record_status: &str,
        date: Option<ExportDate>,
    ) -> Selection {
        let mut selection = Selection::new().equals(RECORD_STATUS_FIELD, record_status);

        selection = match definition.record_type() {
            Some(RecordTypeFilter::Equals(record_type)) => {
                selection.equals(RECORD_TYPE_FIELD, record_type.as_str())
            }
            Some(RecordTypeFilter::Exclude(record_types)) => {
                selection.none_of(RECORD_TYPE_FIELD, record_types.iter().map(String::as_str))
            }
            None => selection,
        };

        match date {
            Some(date) => selection.equals(EXPORT_DATE_FIELD, date.value()),
            None => selection,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Number of batches and rows yielded so far
    pub fn progress(&self) -> (usize, usize) {
        (self.batches, self.rows)
    }

    /// Fetch the next block
    ///
    /// Returns `Ok(None)` once every matching document has been yielded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>> {
        if self.exhausted {
            return Ok(None);
        }

        let block_size = self.definition.block_size();
        let collection = self.definition.collection();
        let documents = self
            .store
            .find_block(collection, &self.selection, self.last_id, block_size)
            .await?;

        if documents.len() < block_size {
            self.exhausted = true;
        }
        let Some(last) = documents.last() else {
            return Ok(None);
        };
        self.last_id = Some(last.id);

        let batch = Batch::from_documents(self.definition.columns(), collection, &documents);
        self.batches += 1;
        self.rows += batch.len();

        tracing::debug!(
            dataset = %self.definition.name(),
            batch = self.batches,
            rows = batch.len(),
            total_rows = self.rows,
            "Extracted batch"
        );

        Ok(Some(batch))
    }

    /// Adapt the extractor into a stream of batches
    pub fn into_stream(self) -> impl Stream<Item = Result<Batch>> {
        stream::try_unfold(self, |mut extractor| async move {
            Ok(extractor
                .next_batch()
                .await?
                .map(|batch| (batch, extractor)))
        })
    }
}
