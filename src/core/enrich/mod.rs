//! Lookup enrichment of extracted batches
//!
//! Batches are completed with data held outside the primary collection:
//! keyed joins fill columns sourced from auxiliary collections, then the
//! multimedia field is resolved into image URLs.

pub mod join;
pub mod multimedia;

pub use join::join_collection;
pub use multimedia::{effective_dimension, enrich_multimedia, MultimediaSettings};

use crate::adapters::database::traits::DocumentStore;
use crate::core::extract::Batch;
use crate::datasets::DatasetDefinition;
use crate::domain::Result;

/// Run every enrichment the dataset declares on `batch`
///
/// # Errors
///
/// Returns an error if a lookup fails.
pub async fn enrich_batch(
    store: &(dyn DocumentStore + Send + Sync),
    definition: &DatasetDefinition,
    batch: &mut Batch,
    multimedia: &MultimediaSettings,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    for spec in definition.joins() {
        join_collection(store, definition, batch, spec).await?;
    }

    if let Some(field) = definition.multimedia_field() {
        enrich_multimedia(store, batch, field, multimedia).await?;
    }

    Ok(())
}
