//! Delete propagator
//!
//! Reads the audit export of one date and removes every listed record.
//! Catalogue records are deleted from their remote dataset first, routed
//! by record type; the document itself is then removed from the store
//! whether or not the remote delete happened.
//!
//! Remote and local deletes are not transactional. Rerunning a date is
//! safe: documents already removed skip the remote step and a remote
//! not-found is treated as done.

use crate::adapters::ckan::{DatasetService, Record};
use crate::adapters::database::traits::DocumentStore;
use crate::adapters::exports::{AuditReader, ExportCatalog, AUDIT_EXTENSION, AUDIT_MODULE};
use crate::config::SyncConfig;
use crate::core::delete::summary::DeleteSummary;
use crate::core::publish::ResourceIdCache;
use crate::core::state::{StateManager, DELETE_TASK_ID};
use crate::datasets::{CollectionRegistry, DeleteDispatch, SchemaRegistry};
use crate::domain::{AuditDeleteRecord, ExportDate, RecordId, Result};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of the remote step for one catalogue record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteDelete {
    /// Filtered delete accepted by the remote service
    Deleted,
    /// The remote service had nothing to delete
    NotFound,
    /// The catalogue document is no longer in the store
    DocumentAbsent,
    /// The document has no primary-key value to filter on
    MissingPrimaryKey,
}

/// Propagates source deletions to the remote datasets and the store
pub struct DeletePropagator {
    store: Arc<dyn DocumentStore + Send + Sync>,
    state_manager: Arc<StateManager>,
    service: Arc<dyn DatasetService>,
    cache: Arc<ResourceIdCache>,
    registry: Arc<SchemaRegistry>,
    collections: CollectionRegistry,
    dispatch: DeleteDispatch,
    exports: ExportCatalog,
    full_export_date: Option<ExportDate>,
    dry_run: bool,
}

impl DeletePropagator {
    /// Create a propagator with the standard collections and dispatch list
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `store` - Document store holding the ingested exports
    /// * `state_manager` - Completion marker access
    /// * `service` - Remote dataset service
    /// * `cache` - Resource-id cache shared with the publish stage
    /// * `registry` - Dataset definitions
    pub fn new(
        config: &SyncConfig,
        store: Arc<dyn DocumentStore + Send + Sync>,
        state_manager: Arc<StateManager>,
        service: Arc<dyn DatasetService>,
        cache: Arc<ResourceIdCache>,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        Self {
            store,
            state_manager,
            service,
            cache,
            registry,
            collections: CollectionRegistry::standard(),
            dispatch: DeleteDispatch::standard(),
            exports: ExportCatalog::new(&config.exports.directory),
            full_export_date: config.exports.full_export_date,
            dry_run: config.application.dry_run,
        }
    }

    pub fn with_collections(mut self, collections: CollectionRegistry) -> Self {
        self.collections = collections;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DeleteDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Propagate every deletion listed for `date`, then mark the date done
    ///
    /// On the full export date there is no audit file; nothing is deleted
    /// but completion is still recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the audit file for `date` is missing or unreadable
    /// - a dataset's remote resource cannot be resolved
    /// - the remote service fails with anything but not-found
    /// - a store query or delete fails
    pub async fn run(&self, date: ExportDate) -> Result<DeleteSummary> {
        let start_time = Instant::now();
        let mut summary = DeleteSummary::new(date);
        summary.dry_run = self.dry_run;

        crate::log_stage_start!(DELETE_TASK_ID, Some(date.value()));
        tracing::info!(dry_run = self.dry_run, "Starting delete propagation");

        if self.full_export_date == Some(date) {
            tracing::info!(date = %date, "Full export date has no audit file, nothing to delete");
            summary.full_export = true;
        } else {
            let file = self.exports.locate(AUDIT_MODULE, AUDIT_EXTENSION, date)?;
            let mut reader = AuditReader::open(&file)?;

            for record in reader.by_ref() {
                let record = record?;
                summary.records_read += 1;
                self.propagate(&record, &mut summary).await?;
            }
            summary.records_skipped += reader.skipped();
        }

        self.state_manager
            .mark_complete(DELETE_TASK_ID, date, self.dry_run)
            .await?;

        let summary = summary.with_duration(start_time.elapsed());
        crate::log_stage_complete!(DELETE_TASK_ID, summary.records_read, summary.duration);
        summary.log_summary();
        Ok(summary)
    }

    /// Delete one audit record remotely (catalogue only) and locally
    ///
    /// # Errors
    ///
    /// Same as [`DeletePropagator::run`], minus file access.
    pub async fn propagate(
        &self,
        record: &AuditDeleteRecord,
        summary: &mut DeleteSummary,
    ) -> Result<()> {
        let Some(collection) = self.collections.resolve(&record.collection) else {
            tracing::debug!(
                collection = %record.collection,
                record_id = %record.record_id,
                "Skipping delete for untracked collection"
            );
            summary.records_skipped += 1;
            return Ok(());
        };

        if self.collections.is_catalogue(collection) {
            match self.delete_remote(collection, record.record_id).await? {
                RemoteDelete::Deleted => summary.remote_deleted += 1,
                RemoteDelete::NotFound => summary.remote_not_found += 1,
                RemoteDelete::DocumentAbsent | RemoteDelete::MissingPrimaryKey => {
                    summary.remote_skipped += 1
                }
            }
        }

        if self.dry_run {
            tracing::info!(
                collection,
                record_id = %record.record_id,
                "DRY RUN: Would delete document"
            );
            summary.local_deleted += 1;
        } else if self.store.delete_by_id(collection, record.record_id).await? {
            summary.local_deleted += 1;
        }

        Ok(())
    }

    /// Remove the published row of a catalogue record
    ///
    /// The filter uses the raw primary-key value from the document, without
    /// the namespace prefix applied on write.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails, the resource cannot be
    /// resolved, or the remote delete fails with anything but not-found.
    pub async fn delete_remote(&self, collection: &str, id: RecordId) -> Result<RemoteDelete> {
        let Some(document) = self.store.find_one(collection, id).await? else {
            tracing::debug!(collection, record_id = %id, "Document already removed");
            return Ok(RemoteDelete::DocumentAbsent);
        };

        let definition = self.registry.get(self.dispatch.select(&document))?;
        let primary_key = definition.primary_key_column();

        let value = match document.get(primary_key.field()) {
            Some(value) if !value.is_null() => value,
            _ => {
                tracing::error!(
                    collection,
                    record_id = %id,
                    dataset = %definition.name(),
                    field = %primary_key.field(),
                    "Record has no primary key value, skipping remote delete"
                );
                return Ok(RemoteDelete::MissingPrimaryKey);
            }
        };

        let resource_id = self.cache.resolve(definition.name()).await?;
        let mut filters = Record::new();
        filters.insert(primary_key.destination().to_string(), value);

        if self.dry_run {
            tracing::info!(
                resource_id = %resource_id,
                filters = %serde_json::Value::Object(filters),
                "DRY RUN: Would delete remote row"
            );
            return Ok(RemoteDelete::Deleted);
        }

        match self.service.datastore_delete(&resource_id, filters).await {
            Ok(()) => {
                tracing::debug!(
                    resource_id = %resource_id,
                    record_id = %id,
                    "Deleted remote row"
                );
                Ok(RemoteDelete::Deleted)
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    resource_id = %resource_id,
                    record_id = %id,
                    "Remote row not found"
                );
                Ok(RemoteDelete::NotFound)
            }
            Err(e) => Err(e),
        }
    }
}
