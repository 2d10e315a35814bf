//! Keyed join of an auxiliary collection onto a batch
//!
//! A join key column holds the `_id` of a document in another collection
//! (for example the taxonomy record of an index lot). The distinct non-zero
//! keys are fetched in one query and the columns sourced from that
//! collection are filled row by row. Rows without a match keep their fill
//! values.

use crate::adapters::database::traits::{DocumentStore, Selection};
use crate::core::extract::Batch;
use crate::datasets::{DatasetDefinition, JoinSpec};
use crate::domain::{Document, RecordId, Result, SyncError};
use std::collections::{BTreeSet, HashMap};

/// Join `spec.collection` onto `batch`
///
/// Returns the number of rows that found a match.
///
/// # Errors
///
/// Returns an error if the key column is missing or not an integer column,
/// or the store lookup fails.
pub async fn join_collection(
    store: &(dyn DocumentStore + Send + Sync),
    definition: &DatasetDefinition,
    batch: &mut Batch,
    spec: &JoinSpec,
) -> Result<usize> {
    let key_column = batch.column(&spec.key_column).ok_or_else(|| {
        SyncError::Validation(format!("Join key column '{}' not in batch", spec.key_column))
    })?;
    if !key_column.type_tag.is_integer() {
        return Err(SyncError::Validation(format!(
            "Join key column '{}' is not an integer column",
            spec.key_column
        )));
    }

    let keys: Vec<i64> = (0..batch.len())
        .map(|row| key_column.values.integer(row).unwrap_or(0))
        .collect();
    let unique: BTreeSet<i64> = keys.iter().copied().filter(|k| *k != 0).collect();
    if unique.is_empty() {
        return Ok(0);
    }

    let ids: Vec<RecordId> = unique.into_iter().map(RecordId::new).collect();
    let documents: HashMap<i64, Document> = store
        .find_by_ids(&spec.collection, &ids, &Selection::new())
        .await?
        .into_iter()
        .map(|doc| (doc.id.value(), doc))
        .collect();

    let mut matched = 0;
    for (row, key) in keys.iter().enumerate() {
        let Some(document) = documents.get(key) else {
            continue;
        };
        matched += 1;
        for triple in definition.collection_columns(&spec.collection) {
            if let Some(column) = batch.column_mut(triple.destination()) {
                column.set(row, document.get(triple.field()).as_ref());
            }
        }
    }

    tracing::debug!(
        collection = %spec.collection,
        requested = ids.len(),
        found = documents.len(),
        matched,
        "Joined collection onto batch"
    );
    Ok(matched)
}
