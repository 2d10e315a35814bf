//! Remote dataset service abstraction
//!
//! The publishing and delete stages reach the remote dataset service only
//! through [`DatasetService`]. [`CkanClient`](super::CkanClient) talks to a
//! live CKAN site; [`InMemoryDatasetService`](super::InMemoryDatasetService)
//! backs the tests.

use crate::adapters::ckan::models::{DatastoreCreate, FieldSpec, Package, Record};
use crate::datasets::{GeospatialFields, PackageDescriptor};
use crate::domain::{ResourceId, Result};
use async_trait::async_trait;

/// Actions of the CKAN action API used by catalogue-sync
///
/// Every method fails with [`CkanError::NotFound`](crate::domain::CkanError::NotFound)
/// when the named package or resource does not exist, so callers can branch
/// on absence without inspecting messages.
#[async_trait]
pub trait DatasetService: Send + Sync {
    /// `package_show`: a package and its resources, by name or id
    async fn package_show(&self, name: &str) -> Result<Package>;

    /// `package_create`: create an empty package
    async fn package_create(&self, package: &PackageDescriptor) -> Result<Package>;

    /// `datastore_search` with `limit = 0`: the datastore columns of a resource
    async fn datastore_fields(&self, resource_id: &ResourceId) -> Result<Vec<FieldSpec>>;

    /// `datastore_create`: create a resource with its datastore table
    async fn datastore_create(&self, request: &DatastoreCreate) -> Result<ResourceId>;

    /// `create_geom_columns`: derive geometry columns from coordinate fields
    async fn create_geom_columns(
        &self,
        resource_id: &ResourceId,
        fields: &GeospatialFields,
    ) -> Result<()>;

    /// `datastore_upsert` with `method = upsert`
    async fn datastore_upsert(&self, resource_id: &ResourceId, records: Vec<Record>)
        -> Result<()>;

    /// `datastore_delete`: delete the rows matching every filter
    async fn datastore_delete(&self, resource_id: &ResourceId, filters: Record) -> Result<()>;
}
