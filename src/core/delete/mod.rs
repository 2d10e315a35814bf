//! Propagation of source deletions
//!
//! Records listed in an export date's `eaudit` file are removed from the
//! remote datasets and from the document store.

pub mod propagator;
pub mod summary;

pub use propagator::{DeletePropagator, RemoteDelete};
pub use summary::DeleteSummary;
