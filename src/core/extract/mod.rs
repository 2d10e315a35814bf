//! Batch extraction and type coercion
//!
//! The extractor pulls bounded blocks of documents from the store and the
//! coercion layer turns each block into a typed [`Batch`].

pub mod batch;
pub mod coerce;
pub mod extractor;

pub use batch::{Batch, Column, ColumnValues};
pub use extractor::{BatchExtractor, EXPORT_DATE_FIELD, RECORD_STATUS_FIELD};
