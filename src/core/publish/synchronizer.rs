//! Remote dataset synchronizer
//!
//! Makes sure the package, resource and datastore schema of a dataset exist
//! on the remote service before anything is written:
//!
//! ```text
//! LookupPackage ──found──▶ FindResource ──found──▶ Validate ──▶ Resolved
//!      │                        │
//!  not found                 missing
//!      ▼                        ▼
//! CreatePackage ──────────▶ CreateResource ──▶ (geometry columns) ──▶ Resolved
//! ```
//!
//! The resolved id is stored in the shared [`ResourceIdCache`]; a cached id
//! skips the state machine entirely.

use crate::adapters::ckan::{DatasetService, DatastoreCreate, FieldSpec, NewResource, Package};
use crate::core::publish::cache::ResourceIdCache;
use crate::datasets::DatasetDefinition;
use crate::domain::{ResourceId, Result, SyncError, ID_FIELD};
use std::sync::Arc;

/// Setup states
#[derive(Debug)]
enum SetupState {
    LookupPackage,
    CreatePackage,
    FindResource(Package),
    CreateResource(Package),
    Resolved(ResourceId),
}

/// Ensures datasets exist remotely with the expected schema
pub struct DatasetSynchronizer {
    service: Arc<dyn DatasetService>,
    cache: Arc<ResourceIdCache>,
    dry_run: bool,
}

impl DatasetSynchronizer {
    /// Create a synchronizer
    ///
    /// # Arguments
    ///
    /// * `service` - Remote dataset service
    /// * `cache` - Shared resource-id cache
    /// * `dry_run` - Log creates instead of performing them
    pub fn new(
        service: Arc<dyn DatasetService>,
        cache: Arc<ResourceIdCache>,
        dry_run: bool,
    ) -> Self {
        Self {
            service,
            cache,
            dry_run,
        }
    }

    pub fn cache(&self) -> &Arc<ResourceIdCache> {
        &self.cache
    }

    /// Resolve the resource id of a dataset, creating what is missing
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SchemaMismatch`] if an existing resource's
    /// fields differ from the dataset output columns, and any remote error
    /// other than a not-found lookup.
    pub async fn ensure_resource(&self, definition: &DatasetDefinition) -> Result<ResourceId> {
        if let Some(resource_id) = self.cache.get(definition.name()).await {
            tracing::debug!(
                dataset = %definition.name(),
                resource_id = %resource_id,
                "Using cached resource id"
            );
            return Ok(resource_id);
        }

        let mut state = SetupState::LookupPackage;
        let resource_id = loop {
            state = match state {
                SetupState::LookupPackage => {
                    match self.service.package_show(definition.name()).await {
                        Ok(package) => SetupState::FindResource(package),
                        Err(e) if e.is_not_found() => {
                            tracing::info!(
                                package = %definition.name(),
                                "Package not found, creating"
                            );
                            SetupState::CreatePackage
                        }
                        Err(e) => return Err(e),
                    }
                }
                SetupState::CreatePackage => {
                    SetupState::CreateResource(self.create_package(definition).await?)
                }
                SetupState::FindResource(package) => {
                    let name = definition.resource().name.as_str();
                    let existing = package
                        .resources
                        .iter()
                        .find(|r| r.name.as_deref() == Some(name));
                    match existing {
                        Some(resource) => {
                            let resource_id =
                                ResourceId::new(resource.id.clone()).map_err(|e| {
                                    SyncError::Validation(format!(
                                        "Resource of {}: {e}",
                                        definition.name()
                                    ))
                                })?;
                            self.validate_resource(definition, &resource_id).await?;
                            SetupState::Resolved(resource_id)
                        }
                        None => SetupState::CreateResource(package),
                    }
                }
                SetupState::CreateResource(package) => {
                    SetupState::Resolved(self.create_resource(definition, &package).await?)
                }
                SetupState::Resolved(resource_id) => break resource_id,
            };
        };

        if !self.dry_run {
            self.cache.insert(definition.name(), resource_id.clone()).await;
        }
        tracing::info!(
            dataset = %definition.name(),
            resource_id = %resource_id,
            "Dataset resource ready"
        );
        Ok(resource_id)
    }

    /// Check that the remote datastore fields match the output columns
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SchemaMismatch`] when the field lists differ.
    pub async fn validate_resource(
        &self,
        definition: &DatasetDefinition,
        resource_id: &ResourceId,
    ) -> Result<()> {
        let actual: Vec<String> = self
            .service
            .datastore_fields(resource_id)
            .await?
            .into_iter()
            .map(|f| f.id)
            .filter(|id| id != ID_FIELD)
            .collect();
        let expected = definition.output_field_names();

        if actual != expected {
            return Err(SyncError::SchemaMismatch {
                resource: resource_id.to_string(),
                expected,
                actual,
            });
        }

        tracing::debug!(resource_id = %resource_id, "Datastore fields match output columns");
        Ok(())
    }

    async fn create_package(&self, definition: &DatasetDefinition) -> Result<Package> {
        if self.dry_run {
            tracing::info!(package = %definition.name(), "DRY RUN: Would create package");
            return Ok(Package {
                id: format!("dry-run-{}", definition.name()),
                name: definition.name().to_string(),
                resources: Vec::new(),
            });
        }
        self.service.package_create(definition.package()).await
    }

    async fn create_resource(
        &self,
        definition: &DatasetDefinition,
        package: &Package,
    ) -> Result<ResourceId> {
        let request = DatastoreCreate {
            resource: NewResource::from_descriptor(package.id.clone(), definition.resource()),
            fields: datastore_fields(definition),
            primary_key: definition.primary_key().to_string(),
        };

        tracing::info!(
            resource = %definition.resource().name,
            package = %package.name,
            fields = request.fields.len(),
            "Resource not found, creating"
        );

        if self.dry_run {
            tracing::info!(
                resource = %definition.resource().name,
                "DRY RUN: Would create datastore resource"
            );
            return ResourceId::new(format!("dry-run-{}", definition.name()))
                .map_err(SyncError::Validation);
        }

        let resource_id = self.service.datastore_create(&request).await?;

        if let Some(geospatial) = definition.geospatial() {
            tracing::info!(resource_id = %resource_id, "Creating geometry columns");
            self.service
                .create_geom_columns(&resource_id, geospatial)
                .await?;
        }

        Ok(resource_id)
    }
}

/// Datastore field schema of the output columns
pub fn datastore_fields(definition: &DatasetDefinition) -> Vec<FieldSpec> {
    definition
        .output_columns()
        .map(|c| FieldSpec::new(c.destination(), c.type_tag().remote_type()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ckan::InMemoryDatasetService;
    use crate::datasets::{DatasetVariant, SchemaRegistry};

    fn setup() -> (Arc<InMemoryDatasetService>, DatasetSynchronizer) {
        let service = Arc::new(InMemoryDatasetService::new());
        let cache = Arc::new(ResourceIdCache::new(service.clone()));
        let synchronizer = DatasetSynchronizer::new(service.clone(), cache, false);
        (service, synchronizer)
    }

    fn specimen() -> Arc<DatasetDefinition> {
        SchemaRegistry::standard()
            .unwrap()
            .get(DatasetVariant::Specimen)
            .unwrap()
    }

    #[tokio::test]
    async fn test_creates_package_resource_and_geometry() {
        let (service, synchronizer) = setup();
        let definition = specimen();

        let resource_id = synchronizer.ensure_resource(&definition).await.unwrap();

        assert_eq!(
            service.calls().await,
            vec!["package_show", "package_create", "datastore_create", "create_geom_columns"]
        );
        assert!(service.has_geometry(&resource_id).await);

        let fields = service.fields(&resource_id).await;
        assert_eq!(
            fields.iter().map(|f| f.id.clone()).collect::<Vec<_>>(),
            definition.output_field_names()
        );
        let year = fields.iter().find(|f| f.id == "year").unwrap();
        assert_eq!(year.field_type, "integer");
        let latitude = fields.iter().find(|f| f.id == "decimalLatitude").unwrap();
        assert_eq!(latitude.field_type, "float");
    }

    #[tokio::test]
    async fn test_second_setup_is_idempotent() {
        let service = Arc::new(InMemoryDatasetService::new());
        let definition = specimen();

        let first = DatasetSynchronizer::new(
            service.clone(),
            Arc::new(ResourceIdCache::new(service.clone())),
            false,
        );
        let created = first.ensure_resource(&definition).await.unwrap();

        // A new synchronizer with an empty cache sees the existing resource
        let second = DatasetSynchronizer::new(
            service.clone(),
            Arc::new(ResourceIdCache::new(service.clone())),
            false,
        );
        let calls_before = service.calls().await.len();
        let resolved = second.ensure_resource(&definition).await.unwrap();

        assert_eq!(created, resolved);
        let new_calls = service.calls().await.split_off(calls_before);
        assert_eq!(new_calls, vec!["package_show", "datastore_search"]);
    }

    #[tokio::test]
    async fn test_cached_id_skips_remote_calls() {
        let (service, synchronizer) = setup();
        let definition = specimen();

        synchronizer.ensure_resource(&definition).await.unwrap();
        let calls = service.calls().await.len();
        synchronizer.ensure_resource(&definition).await.unwrap();
        assert_eq!(service.calls().await.len(), calls);
    }

    #[tokio::test]
    async fn test_existing_package_without_resource() {
        let (service, synchronizer) = setup();
        let definition = specimen();
        service.seed_package(definition.name()).await;

        synchronizer.ensure_resource(&definition).await.unwrap();
        assert_eq!(service.call_count("package_create").await, 0);
        assert_eq!(service.call_count("datastore_create").await, 1);
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_fatal() {
        let (service, synchronizer) = setup();
        let definition = specimen();
        service
            .seed_resource(
                definition.name(),
                &definition.resource().name,
                vec![FieldSpec::new("occurrenceID", "citext")],
                None,
            )
            .await;

        let err = synchronizer.ensure_resource(&definition).await.unwrap_err();
        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
        assert!(synchronizer.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_remote_error_other_than_not_found_is_fatal() {
        let (service, synchronizer) = setup();
        service.fail_on("package_show").await;
        assert!(synchronizer.ensure_resource(&specimen()).await.is_err());
        assert_eq!(service.call_count("package_create").await, 0);
    }

    #[tokio::test]
    async fn test_dry_run_creates_nothing() {
        let service = Arc::new(InMemoryDatasetService::new());
        let cache = Arc::new(ResourceIdCache::new(service.clone()));
        let synchronizer = DatasetSynchronizer::new(service.clone(), cache.clone(), true);

        synchronizer.ensure_resource(&specimen()).await.unwrap();
        assert_eq!(service.calls().await, vec!["package_show"]);
        assert!(cache.is_empty().await);
    }
}
