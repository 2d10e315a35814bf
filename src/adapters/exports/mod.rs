//! KE EMu export files on disk
//!
//! Exports land in a single directory as `module.extension.date` files,
//! optionally gzip-compressed. [`ExportCatalog`] finds them and
//! [`AuditReader`] parses the deleted-records audit export.

pub mod audit;
pub mod catalog;

pub use audit::{AuditReader, AUDIT_EXTENSION, AUDIT_MODULE};
pub use catalog::{ExportCatalog, ExportFile};
