//! CLI command implementations
//!
//! Every command that touches the store or the remote service builds its
//! collaborators through [`SyncContext::connect`].

pub mod delete;
pub mod publish;
pub mod status;
pub mod validate;

use crate::adapters::ckan::{create_dataset_service, DatasetService};
use crate::adapters::database::{create_stores, DocumentStore};
use crate::config::SyncConfig;
use crate::core::publish::ResourceIdCache;
use crate::core::state::StateManager;
use crate::datasets::SchemaRegistry;
use crate::domain::Result;
use std::sync::Arc;

/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;

/// Exit code for store or remote connection failures
pub const EXIT_CONNECTION: i32 = 4;

/// Exit code for fatal errors during a run
pub const EXIT_FATAL: i32 = 5;

/// Exit code after a graceful shutdown on SIGINT/SIGTERM
pub const EXIT_INTERRUPTED: i32 = 130;

/// Shared collaborators of one command run
pub struct SyncContext {
    pub store: Arc<dyn DocumentStore + Send + Sync>,
    pub state_manager: Arc<StateManager>,
    pub service: Arc<dyn DatasetService>,
    pub cache: Arc<ResourceIdCache>,
    pub registry: Arc<SchemaRegistry>,
}

impl SyncContext {
    /// Open the document store and build the remote client
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the HTTP client
    /// cannot be built.
    pub async fn connect(config: &SyncConfig) -> Result<Self> {
        let (store, markers) = create_stores(&config.document_store).await?;
        store.test_connection().await?;

        let service = create_dataset_service(&config.ckan)?;
        let cache = Arc::new(ResourceIdCache::new(service.clone()));

        Ok(Self {
            store,
            state_manager: Arc::new(StateManager::new_with_storage(markers)),
            service,
            cache,
            registry: Arc::new(SchemaRegistry::standard()?),
        })
    }
}
