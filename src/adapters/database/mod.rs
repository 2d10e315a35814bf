//! Storage abstraction layer
//!
//! Trait-based access to the document store and completion markers, with
//! PostgreSQL and in-memory backends.

pub mod factory;
pub mod memory;
pub mod traits;

pub use factory::{create_stores, StoreHandles};
pub use memory::{InMemoryDocumentStore, InMemoryMarkerStore};
pub use traits::{CompletionMarker, Condition, DocumentStore, MarkerStore, Selection};
