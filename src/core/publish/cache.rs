//! Resource-id cache
//!
//! Maps dataset names to the id of their datastore resource. Entries are
//! filled by the synchronizer or lazily from `package_show` and are never
//! invalidated by the pipeline; [`ResourceIdCache::invalidate`] is available
//! to callers that know a resource changed remotely.

use crate::adapters::ckan::DatasetService;
use crate::domain::{ResourceId, Result, SyncError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Dataset name to resource id memo shared by the publishing and delete stages
pub struct ResourceIdCache {
    service: Arc<dyn DatasetService>,
    entries: RwLock<HashMap<String, ResourceId>>,
}

impl ResourceIdCache {
    pub fn new(service: Arc<dyn DatasetService>) -> Self {
        Self {
            service,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached id of a dataset, without remote calls
    pub async fn get(&self, dataset: &str) -> Option<ResourceId> {
        self.entries.read().await.get(dataset).cloned()
    }

    pub async fn insert(&self, dataset: &str, resource_id: ResourceId) {
        tracing::debug!(dataset, resource_id = %resource_id, "Caching resource id");
        self.entries
            .write()
            .await
            .insert(dataset.to_string(), resource_id);
    }

    /// Resource id of a dataset, looked up on a miss
    ///
    /// On a miss the dataset's package is fetched and its first resource
    /// is cached.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ResourceNotFound`] naming the dataset if the
    /// package does not exist or has no resources, and any other remote
    /// error unchanged.
    pub async fn resolve(&self, dataset: &str) -> Result<ResourceId> {
        if let Some(resource_id) = self.get(dataset).await {
            return Ok(resource_id);
        }

        tracing::info!(dataset, "Resource id not cached, looking up package");
        let package = match self.service.package_show(dataset).await {
            Ok(package) => package,
            Err(e) if e.is_not_found() => {
                return Err(SyncError::ResourceNotFound(dataset.to_string()))
            }
            Err(e) => return Err(e),
        };

        let resource = package
            .resources
            .first()
            .ok_or_else(|| SyncError::ResourceNotFound(dataset.to_string()))?;
        let resource_id = ResourceId::new(resource.id.clone())
            .map_err(|_| SyncError::ResourceNotFound(dataset.to_string()))?;

        self.insert(dataset, resource_id.clone()).await;
        Ok(resource_id)
    }

    /// Forget the cached id of a dataset
    pub async fn invalidate(&self, dataset: &str) -> Option<ResourceId> {
        self.entries.write().await.remove(dataset)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ckan::InMemoryDatasetService;

    #[tokio::test]
    async fn test_resolve_caches_first_resource() {
        let service = Arc::new(InMemoryDatasetService::new());
        let id = service
            .seed_resource("collection-specimens", "Specimens", vec![], None)
            .await;
        let cache = ResourceIdCache::new(service.clone());

        assert_eq!(cache.resolve("collection-specimens").await.unwrap(), id);
        assert_eq!(cache.resolve("collection-specimens").await.unwrap(), id);
        assert_eq!(service.call_count("package_show").await, 1);
    }

    #[tokio::test]
    async fn test_resolve_missing_dataset_is_fatal() {
        let service = Arc::new(InMemoryDatasetService::new());
        service.seed_package("collection-artefacts").await;
        let cache = ResourceIdCache::new(service);

        for dataset in ["collection-specimens", "collection-artefacts"] {
            let err = cache.resolve(dataset).await.unwrap_err();
            assert!(!err.is_not_found());
            assert!(err.to_string().contains(dataset));
        }
    }

    #[tokio::test]
    async fn test_invalidate_forces_lookup() {
        let service = Arc::new(InMemoryDatasetService::new());
        service
            .seed_resource("collection-specimens", "Specimens", vec![], None)
            .await;
        let cache = ResourceIdCache::new(service.clone());

        cache.resolve("collection-specimens").await.unwrap();
        assert!(cache.invalidate("collection-specimens").await.is_some());
        assert!(cache.is_empty().await);
        cache.resolve("collection-specimens").await.unwrap();
        assert_eq!(service.call_count("package_show").await, 2);
    }
}
