//! Storage backend factory
//!
//! Builds the document store and marker store selected by
//! `document_store.backend`.

use crate::adapters::database::memory::{InMemoryDocumentStore, InMemoryMarkerStore};
use crate::adapters::database::traits::{DocumentStore, MarkerStore};
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{DocumentStoreConfig, StoreBackend};
use crate::domain::Result;
use std::sync::Arc;

/// Shared handles to the configured storage backend
pub type StoreHandles = (
    Arc<dyn DocumentStore + Send + Sync>,
    Arc<dyn MarkerStore + Send + Sync>,
);

/// Create the document store and marker store from one backend
///
/// Both handles share the same connection pool. For PostgreSQL the schema
/// migration runs before the handles are returned.
///
/// # Errors
///
/// Returns an error if the pool cannot be created or the migration fails.
pub async fn create_stores(config: &DocumentStoreConfig) -> Result<StoreHandles> {
    match config.backend {
        StoreBackend::PostgreSQL => {
            tracing::info!("Creating PostgreSQL document store");
            let client = Arc::new(PostgreSQLClient::new(config.clone()).await?);
            client.ensure_schema().await?;
            let adapter = Arc::new(PostgreSQLAdapter::new_with_arc(client));

            Ok((
                adapter.clone() as Arc<dyn DocumentStore + Send + Sync>,
                adapter as Arc<dyn MarkerStore + Send + Sync>,
            ))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; nothing is persisted");
            Ok((
                Arc::new(InMemoryDocumentStore::new()),
                Arc::new(InMemoryMarkerStore::new()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExportDate;

    #[tokio::test]
    async fn test_create_memory_stores() {
        let (documents, markers) = create_stores(&DocumentStoreConfig::default())
            .await
            .unwrap();
        documents.test_connection().await.unwrap();

        let date = ExportDate::new(20140522).unwrap();
        markers.touch("delete", date, false).await.unwrap();
        assert!(markers.exists("delete", date).await.unwrap());
    }
}
