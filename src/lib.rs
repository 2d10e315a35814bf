// catalogue-sync - KE EMu catalogue publishing tool
// Copyright (c) 2025 catalogue-sync contributors
// Licensed under the MIT License

//! # catalogue-sync - KE EMu catalogue publishing
//!
//! catalogue-sync publishes natural-history collection records, imported
//! from dated KE EMu exports into a document store, to a CKAN data portal,
//! and keeps the published copy consistent when source records are deleted.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Extracting** catalogue documents in bounded blocks as typed batches
//! - **Coercing** every column deterministically, filling missing values
//! - **Enriching** batches with joined taxonomy data and multimedia URLs
//! - **Publishing** to CKAN datastore resources created on demand
//! - **Propagating** source deletions to the remote datasets and the store
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (extract, enrich, publish, delete, state)
//! - [`datasets`] - Dataset definitions and registries
//! - [`adapters`] - External integrations (CKAN, PostgreSQL, export files)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Export Date Ordering
//!
//! Dated exports are processed strictly in order. Publishing the records of
//! one export date requires every earlier export to carry a `delete`
//! completion marker:
//!
//! ```rust,no_run
//! use catalogue_sync::adapters::database::InMemoryMarkerStore;
//! use catalogue_sync::core::state::StateManager;
//! use catalogue_sync::domain::ExportDate;
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state_manager = StateManager::new_with_storage(Arc::new(InMemoryMarkerStore::new()));
//! let exports: BTreeSet<ExportDate> = ["20140101".parse::<ExportDate>()?, "20140108".parse::<ExportDate>()?].into();
//!
//! // Fails: the 20140101 export has not been processed
//! let result = state_manager.ensure_export_date(&exports, "20140108".parse::<ExportDate>()?).await;
//! assert!(result.is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::SyncError`]. A CKAN
//! "not found" is a distinct variant so deletes can treat it as done:
//!
//! ```rust,no_run
//! use catalogue_sync::domain::{CkanError, SyncError};
//!
//! let err = SyncError::from(CkanError::NotFound("Resource not found".to_string()));
//! assert!(err.is_not_found());
//! ```
//!
//! ## Logging
//!
//! Structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(dataset = "collection-specimens", "Starting publish");
//! warn!(collection = "eparties", "Skipping delete for untracked collection");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod datasets;
pub mod domain;
pub mod logging;
