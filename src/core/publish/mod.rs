//! Publishing of datasets to the remote service
//!
//! Resolves each dataset's remote resource, then streams enriched batches
//! from the document store to the configured writer.

pub mod cache;
pub mod coordinator;
pub mod summary;
pub mod synchronizer;
pub mod writer;

pub use cache::ResourceIdCache;
pub use coordinator::PublishCoordinator;
pub use summary::PublishSummary;
pub use synchronizer::{datastore_fields, DatasetSynchronizer};
pub use writer::{create_writer, ApiWriter, BatchWriter, CsvWriter};
