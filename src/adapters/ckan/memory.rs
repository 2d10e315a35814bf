//! In-memory dataset service
//!
//! Keeps packages, resources and datastore rows in memory and records every
//! action call, so tests can assert on what would have been sent to CKAN.

use crate::adapters::ckan::models::{DatastoreCreate, FieldSpec, Package, Record, Resource};
use crate::adapters::ckan::service::DatasetService;
use crate::datasets::{GeospatialFields, PackageDescriptor};
use crate::domain::{CkanError, ResourceId, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct StoredResource {
    fields: Vec<FieldSpec>,
    primary_key: Option<String>,
    rows: Vec<Record>,
    geometry: bool,
}

#[derive(Debug, Default)]
struct State {
    packages: HashMap<String, Package>,
    resources: HashMap<String, StoredResource>,
    calls: Vec<String>,
    deletes: Vec<(ResourceId, Record)>,
    failing: HashSet<String>,
    next_id: usize,
}

impl State {
    fn record(&mut self, action: &str) -> Result<()> {
        self.calls.push(action.to_string());
        if self.failing.contains(action) {
            return Err(CkanError::ServerError {
                status: 500,
                message: format!("{action}: injected failure"),
            }
            .into());
        }
        Ok(())
    }

    fn next_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{kind}-{:04}", self.next_id)
    }

    fn package_mut(&mut self, name_or_id: &str) -> Option<&mut Package> {
        self.packages
            .values_mut()
            .find(|p| p.name == name_or_id || p.id == name_or_id)
    }

    fn resource_mut(&mut self, action: &str, id: &ResourceId) -> Result<&mut StoredResource> {
        self.resources.get_mut(id.as_str()).ok_or_else(|| {
            CkanError::NotFound(format!("{action}: Resource \"{id}\" was not found.")).into()
        })
    }
}

/// [`DatasetService`] backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryDatasetService {
    state: Mutex<State>,
}

impl InMemoryDatasetService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a package with no resources
    pub async fn seed_package(&self, name: &str) -> Package {
        let mut state = self.state.lock().await;
        let package = Package {
            id: state.next_id("package"),
            name: name.to_string(),
            resources: Vec::new(),
        };
        state.packages.insert(name.to_string(), package.clone());
        package
    }

    /// Create a resource with the given datastore fields inside a package,
    /// creating the package if needed
    pub async fn seed_resource(
        &self,
        package_name: &str,
        resource_name: &str,
        fields: Vec<FieldSpec>,
        primary_key: Option<&str>,
    ) -> ResourceId {
        if self.state.lock().await.package_mut(package_name).is_none() {
            self.seed_package(package_name).await;
        }

        let mut state = self.state.lock().await;
        let id = state.next_id("resource");
        if let Some(package) = state.package_mut(package_name) {
            package.resources.push(Resource {
                id: id.clone(),
                name: Some(resource_name.to_string()),
                package_id: Some(package.id.clone()),
            });
        }
        state.resources.insert(
            id.clone(),
            StoredResource {
                fields,
                primary_key: primary_key.map(str::to_string),
                ..StoredResource::default()
            },
        );
        ResourceId(id)
    }

    /// Store rows in a resource without going through `datastore_upsert`
    pub async fn seed_rows(&self, resource_id: &ResourceId, rows: Vec<Record>) {
        if let Some(stored) = self.state.lock().await.resources.get_mut(resource_id.as_str()) {
            stored.rows.extend(rows);
        }
    }

    /// Make every later call of `action` fail with a server error
    pub async fn fail_on(&self, action: &str) {
        self.state.lock().await.failing.insert(action.to_string());
    }

    /// Rows currently held by a resource
    pub async fn rows(&self, resource_id: &ResourceId) -> Vec<Record> {
        self.state
            .lock()
            .await
            .resources
            .get(resource_id.as_str())
            .map(|r| r.rows.clone())
            .unwrap_or_default()
    }

    /// Datastore fields of a resource
    pub async fn fields(&self, resource_id: &ResourceId) -> Vec<FieldSpec> {
        self.state
            .lock()
            .await
            .resources
            .get(resource_id.as_str())
            .map(|r| r.fields.clone())
            .unwrap_or_default()
    }

    /// Whether geometry columns were created for a resource
    pub async fn has_geometry(&self, resource_id: &ResourceId) -> bool {
        self.state
            .lock()
            .await
            .resources
            .get(resource_id.as_str())
            .is_some_and(|r| r.geometry)
    }

    /// Every action called so far, in call order
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    /// Filters of every `datastore_delete` call, in call order
    pub async fn delete_filters(&self) -> Vec<(ResourceId, Record)> {
        self.state.lock().await.deletes.clone()
    }

    /// Number of calls of one action
    pub async fn call_count(&self, action: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.as_str() == action)
            .count()
    }
}

fn row_matches(row: &Record, filters: &Record) -> bool {
    filters.iter().all(|(k, v)| row.get(k) == Some(v))
}

#[async_trait]
impl DatasetService for InMemoryDatasetService {
    async fn package_show(&self, name: &str) -> Result<Package> {
        let mut state = self.state.lock().await;
        state.record("package_show")?;
        state.package_mut(name).map(|p| p.clone()).ok_or_else(|| {
            CkanError::NotFound(format!("package_show: Package \"{name}\" was not found."))
                .into()
        })
    }

    async fn package_create(&self, package: &PackageDescriptor) -> Result<Package> {
        let mut state = self.state.lock().await;
        state.record("package_create")?;
        if state.packages.contains_key(&package.name) {
            return Err(CkanError::Validation(format!(
                "package_create: name \"{}\" already in use",
                package.name
            ))
            .into());
        }
        let created = Package {
            id: state.next_id("package"),
            name: package.name.clone(),
            resources: Vec::new(),
        };
        state.packages.insert(package.name.clone(), created.clone());
        Ok(created)
    }

    async fn datastore_fields(&self, resource_id: &ResourceId) -> Result<Vec<FieldSpec>> {
        let mut state = self.state.lock().await;
        state.record("datastore_search")?;
        let stored = state.resource_mut("datastore_search", resource_id)?;
        let mut fields = vec![FieldSpec::new("_id", "int")];
        fields.extend(stored.fields.iter().cloned());
        Ok(fields)
    }

    async fn datastore_create(&self, request: &DatastoreCreate) -> Result<ResourceId> {
        let mut state = self.state.lock().await;
        state.record("datastore_create")?;

        let id = state.next_id("resource");
        let resource = Resource {
            id: id.clone(),
            name: Some(request.resource.name.clone()),
            package_id: Some(request.resource.package_id.clone()),
        };
        let package = state.package_mut(&request.resource.package_id).ok_or_else(|| {
            CkanError::NotFound(format!(
                "datastore_create: Package \"{}\" was not found.",
                request.resource.package_id
            ))
        })?;
        package.resources.push(resource);

        state.resources.insert(
            id.clone(),
            StoredResource {
                fields: request.fields.clone(),
                primary_key: Some(request.primary_key.clone()),
                ..StoredResource::default()
            },
        );
        Ok(ResourceId(id))
    }

    async fn create_geom_columns(
        &self,
        resource_id: &ResourceId,
        fields: &GeospatialFields,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("create_geom_columns")?;
        let stored = state.resource_mut("create_geom_columns", resource_id)?;
        let declared = |name: &str| stored.fields.iter().any(|f| f.id == name);
        if !declared(&fields.latitude_field) || !declared(&fields.longitude_field) {
            return Err(CkanError::Validation(format!(
                "create_geom_columns: {} / {} are not datastore fields",
                fields.latitude_field, fields.longitude_field
            ))
            .into());
        }
        stored.geometry = true;
        Ok(())
    }

    async fn datastore_upsert(
        &self,
        resource_id: &ResourceId,
        records: Vec<Record>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("datastore_upsert")?;
        let stored = state.resource_mut("datastore_upsert", resource_id)?;

        for record in records {
            let existing = stored.primary_key.as_ref().and_then(|pk| {
                let key = record.get(pk)?;
                stored.rows.iter().position(|row| row.get(pk) == Some(key))
            });
            match existing {
                Some(index) => stored.rows[index] = record,
                None => stored.rows.push(record),
            }
        }
        Ok(())
    }

    async fn datastore_delete(&self, resource_id: &ResourceId, filters: Record) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("datastore_delete")?;
        state.deletes.push((resource_id.clone(), filters.clone()));
        let stored = state.resource_mut("datastore_delete", resource_id)?;
        stored.rows.retain(|row| !row_matches(row, &filters));
        Ok(())
    }
}
