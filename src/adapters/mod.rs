//! External system integrations for catalogue-sync.
//!
//! - [`ckan`] - CKAN action API client and the [`DatasetService`](ckan::DatasetService) seam
//! - [`database`] - Document store and marker store abstraction (trait-based)
//! - [`postgresql`] - PostgreSQL JSONB implementation of the storage traits
//! - [`exports`] - KE EMu export files on disk
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the core logic
//! runs unchanged against in-memory implementations in tests.
//!
//! # CKAN Adapter
//!
//! ```rust,no_run
//! use catalogue_sync::adapters::ckan::create_dataset_service;
//! use catalogue_sync::config::{secret_string, CkanConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CkanConfig {
//!     site_url: "https://data.nhm.ac.uk".to_string(),
//!     api_key: Some(secret_string("api-key".to_string())),
//!     ..Default::default()
//! };
//!
//! let service = create_dataset_service(&config)?;
//! let package = service.package_show("collection-specimens").await?;
//! println!("{} resources", package.resources.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Document Store
//!
//! ```rust,no_run
//! use catalogue_sync::adapters::database::create_stores;
//! use catalogue_sync::config::DocumentStoreConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (store, _markers) = create_stores(&DocumentStoreConfig::default()).await?;
//! store.test_connection().await?;
//! # Ok(())
//! # }
//! ```

pub mod ckan;
pub mod database;
pub mod exports;
pub mod postgresql;
