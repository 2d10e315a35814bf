//! Core business logic for catalogue-sync.
//!
//! # Modules
//!
//! - [`extract`] - Block extraction and type coercion into typed batches
//! - [`enrich`] - Joins against auxiliary collections and multimedia URLs
//! - [`publish`] - Remote resource setup and batch writing
//! - [`delete`] - Propagation of source deletions
//! - [`state`] - Completion markers and export-date ordering
//!
//! # Publish Workflow
//!
//! 1. **Check ordering**: every earlier export date must be processed
//! 2. **Ensure resource**: create or validate the remote package and resource
//! 3. **Extract**: pull one block of matching documents as a typed batch
//! 4. **Enrich**: fill joined columns and multimedia URLs
//! 5. **Write**: upsert to the datastore or append to a CSV file
//! 6. **Repeat** until the collection is exhausted
//!
//! # Example
//!
//! ```rust,no_run
//! use catalogue_sync::adapters::ckan::create_dataset_service;
//! use catalogue_sync::adapters::database::create_stores;
//! use catalogue_sync::config::load_config;
//! use catalogue_sync::core::publish::{PublishCoordinator, ResourceIdCache};
//! use catalogue_sync::core::state::StateManager;
//! use catalogue_sync::datasets::{DatasetVariant, SchemaRegistry};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("catalogue-sync.toml")?;
//! let (store, markers) = create_stores(&config.document_store).await?;
//! let service = create_dataset_service(&config.ckan)?;
//!
//! let coordinator = PublishCoordinator::new(
//!     config,
//!     store,
//!     Arc::new(StateManager::new_with_storage(markers)),
//!     service.clone(),
//!     Arc::new(ResourceIdCache::new(service)),
//!     Arc::new(SchemaRegistry::standard()?),
//! );
//!
//! let summary = coordinator.publish(DatasetVariant::Specimen, None).await?;
//! println!("Rows written: {}", summary.rows_written);
//! # Ok(())
//! # }
//! ```

pub mod delete;
pub mod enrich;
pub mod extract;
pub mod publish;
pub mod state;
