//! Remote dataset service integration
//!
//! catalogue-sync publishes to a CKAN site with the datastore extension.
//! The [`DatasetService`] trait is the seam the publishing and delete stages
//! use; [`CkanClient`] implements it over the action API and
//! [`InMemoryDatasetService`] keeps everything in memory for tests and local
//! dry runs.
//!
//! ```rust,no_run
//! use catalogue_sync::adapters::ckan::{CkanClient, DatasetService};
//! use catalogue_sync::config::CkanConfig;
//!
//! # async fn example() -> catalogue_sync::domain::Result<()> {
//! let client = CkanClient::new(CkanConfig {
//!     site_url: "https://data.nhm.ac.uk".to_string(),
//!     ..CkanConfig::default()
//! })?;
//! let package = client.package_show("collection-specimens").await?;
//! println!("{} has {} resources", package.name, package.resources.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod memory;
pub mod models;
pub mod service;

pub use client::CkanClient;
pub use memory::InMemoryDatasetService;
pub use models::{
    DatastoreCreate, FieldSpec, NewResource, Package, Record, Resource,
};
pub use service::DatasetService;

use crate::config::CkanConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Create the dataset service for a CKAN configuration
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn create_dataset_service(config: &CkanConfig) -> Result<Arc<dyn DatasetService>> {
    Ok(Arc::new(CkanClient::new(config.clone())?))
}
