//! Domain models and types for catalogue-sync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ExportDate`], [`RecordId`], [`ResourceId`])
//! - **Document store records** ([`Document`], [`AuditDeleteRecord`])
//! - **Error types** ([`SyncError`], [`CkanError`], [`DocumentStoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SyncError>`]:
//!
//! ```rust,no_run
//! use catalogue_sync::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = catalogue_sync::config::load_config("catalogue-sync.toml")?;
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod errors;
pub mod ids;
pub mod result;

pub use document::{AuditDeleteRecord, Document, ID_FIELD};
pub use errors::{CkanError, DocumentStoreError, SyncError};
pub use ids::{ExportDate, RecordId, ResourceId};
pub use result::Result;
