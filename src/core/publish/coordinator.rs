//! Publish coordinator - orchestrates the publishing pipeline
//!
//! For each dataset the coordinator resolves the remote resource, pulls
//! blocks from the document store, enriches them and hands them to the
//! configured writer. Batches are processed one at a time; a batch is only
//! requested once the previous one has been written.

use crate::adapters::ckan::DatasetService;
use crate::adapters::database::traits::DocumentStore;
use crate::adapters::exports::ExportCatalog;
use crate::config::SyncConfig;
use crate::core::enrich::{enrich_batch, MultimediaSettings};
use crate::core::extract::BatchExtractor;
use crate::core::publish::cache::ResourceIdCache;
use crate::core::publish::summary::PublishSummary;
use crate::core::publish::synchronizer::DatasetSynchronizer;
use crate::core::publish::writer::create_writer;
use crate::core::state::{StageRun, StateManager};
use crate::datasets::{DatasetVariant, SchemaRegistry};
use crate::domain::{ExportDate, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};

type StageKey = (DatasetVariant, Option<ExportDate>);

/// Publish coordinator
pub struct PublishCoordinator {
    config: SyncConfig,
    store: Arc<dyn DocumentStore + Send + Sync>,
    state_manager: Arc<StateManager>,
    service: Arc<dyn DatasetService>,
    synchronizer: DatasetSynchronizer,
    registry: Arc<SchemaRegistry>,
    multimedia: MultimediaSettings,
    shutdown_signal: Option<watch::Receiver<bool>>,
    runs: Mutex<HashMap<StageKey, Arc<StageRun>>>,
}

impl PublishCoordinator {
    /// Create a new publish coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `store` - Document store holding the ingested exports
    /// * `state_manager` - Completion marker access
    /// * `service` - Remote dataset service
    /// * `cache` - Resource-id cache shared with the delete stage
    /// * `registry` - Dataset definitions
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn DocumentStore + Send + Sync>,
        state_manager: Arc<StateManager>,
        service: Arc<dyn DatasetService>,
        cache: Arc<ResourceIdCache>,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        let synchronizer =
            DatasetSynchronizer::new(service.clone(), cache, config.application.dry_run);
        let multimedia = MultimediaSettings::from_config(&config.publish);

        Self {
            config,
            store,
            state_manager,
            service,
            synchronizer,
            registry,
            multimedia,
            shutdown_signal: None,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Stop between batches once `shutdown_signal` turns true
    pub fn with_shutdown_signal(mut self, shutdown_signal: watch::Receiver<bool>) -> Self {
        self.shutdown_signal = Some(shutdown_signal);
        self
    }

    /// Whether publishing `variant` for `date` has finished in this process
    ///
    /// Publishing always executes, so a fresh coordinator reports every
    /// stage incomplete and a stage in progress reports incomplete until it
    /// finishes. Interrupted runs never complete.
    pub async fn is_complete(&self, variant: DatasetVariant, date: Option<ExportDate>) -> bool {
        self.runs
            .lock()
            .await
            .get(&(variant, date))
            .is_some_and(|run| run.complete())
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_signal
            .as_ref()
            .is_some_and(|signal| *signal.borrow())
    }

    /// Publish several datasets in turn
    ///
    /// Stops at the first failing dataset.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`PublishCoordinator::publish`].
    pub async fn publish_all(
        &self,
        variants: &[DatasetVariant],
        date: Option<ExportDate>,
    ) -> Result<Vec<PublishSummary>> {
        let mut summaries = Vec::with_capacity(variants.len());
        for variant in variants {
            let summary = self.publish(*variant, date).await?;
            let interrupted = summary.interrupted;
            summaries.push(summary);
            if interrupted {
                break;
            }
        }
        Ok(summaries)
    }

    /// Publish one dataset
    ///
    /// With a `date`, only documents ingested from that export are published
    /// and every earlier export must already be processed. The stage always
    /// executes; its completion is only reported by
    /// [`PublishCoordinator::is_complete`] and never persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - earlier export dates are outstanding
    /// - the remote resource cannot be created or its schema differs
    /// - a store query, lookup or write fails
    pub async fn publish(
        &self,
        variant: DatasetVariant,
        date: Option<ExportDate>,
    ) -> Result<PublishSummary> {
        let start_time = Instant::now();
        let definition = self.registry.get(variant)?;
        let stage = Arc::new(StageRun::new(format!("publish-{variant}"), date));
        self.runs
            .lock()
            .await
            .insert((variant, date), stage.clone());
        let dry_run = self.config.application.dry_run;

        let mut summary = PublishSummary::new(variant, date, self.config.publish.target);
        summary.dry_run = dry_run;

        crate::log_stage_start!(stage.name(), date.map(|d| d.value()));
        tracing::info!(
            dataset = %definition.name(),
            target = ?self.config.publish.target,
            dry_run,
            "Starting publish"
        );

        let record_status = self.config.publish.record_status.as_str();
        let mut extractor = match date {
            Some(date) => {
                let export_dates = ExportCatalog::new(&self.config.exports.directory)
                    .export_dates()?;
                BatchExtractor::for_date(
                    self.store.clone(),
                    definition.clone(),
                    record_status,
                    date,
                    &export_dates,
                    &self.state_manager,
                )
                .await?
            }
            None => BatchExtractor::new(
                self.store.clone(),
                definition.clone(),
                record_status,
                None,
            ),
        };

        let resource_id = self.synchronizer.ensure_resource(&definition).await?;
        summary.resource_id = Some(resource_id.clone());

        let mut writer = create_writer(
            &self.config.publish,
            self.service.clone(),
            &definition,
            resource_id,
            date,
            dry_run,
        );

        while let Some(mut batch) = extractor.next_batch().await? {
            summary.batches += 1;
            summary.rows_extracted += batch.len();

            let unkeyed = batch.retain_keyed(definition.primary_key())?;
            for id in &unkeyed {
                tracing::error!(
                    dataset = %definition.name(),
                    record_id = id.value(),
                    primary_key = %definition.primary_key_column().source(),
                    "Record has no primary key value, skipping"
                );
            }
            summary.rows_skipped += unkeyed.len();

            if !batch.is_empty() {
                enrich_batch(
                    self.store.as_ref(),
                    &definition,
                    &mut batch,
                    &self.multimedia,
                )
                .await?;

                if let Some(prefix) = definition.primary_key_prefix() {
                    batch.prefix_column(definition.primary_key(), prefix)?;
                }

                summary.rows_written += writer.write(&batch).await?;
            }

            tracing::debug!(
                dataset = %definition.name(),
                batch = summary.batches,
                rows = batch.len(),
                "Batch written"
            );

            if self.shutdown_requested() {
                tracing::warn!(
                    dataset = %definition.name(),
                    batches = summary.batches,
                    "Shutdown requested, stopping publish after current batch"
                );
                summary.interrupted = true;
                break;
            }
        }

        writer.finish().await?;

        let summary = summary.with_duration(start_time.elapsed());
        if !summary.interrupted {
            stage.mark_run();
            crate::log_stage_complete!(stage.name(), summary.rows_written, summary.duration);
        }
        summary.log_summary();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ckan::InMemoryDatasetService;
    use crate::adapters::database::memory::{InMemoryDocumentStore, InMemoryMarkerStore};
    use crate::adapters::database::traits::MarkerStore;
    use crate::config::{parse_config, WriteTarget};
    use crate::domain::{Document, SyncError};
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        exports: TempDir,
        config: SyncConfig,
        store: Arc<InMemoryDocumentStore>,
        markers: Arc<InMemoryMarkerStore>,
        service: Arc<InMemoryDatasetService>,
    }

    impl Fixture {
        fn new() -> Self {
            let exports = TempDir::new().unwrap();
            let toml = format!(
                r#"
[document_store]
backend = "memory"

[ckan]
site_url = "https://data.example.org"

[exports]
directory = "{}"
"#,
                exports.path().display()
            );
            Self {
                config: parse_config(&toml).unwrap(),
                exports,
                store: Arc::new(InMemoryDocumentStore::new()),
                markers: Arc::new(InMemoryMarkerStore::new()),
                service: Arc::new(InMemoryDatasetService::new()),
            }
        }

        fn export_file(&self, name: &str) {
            std::fs::write(self.exports.path().join(name), "").unwrap();
        }

        fn coordinator(&self) -> PublishCoordinator {
            let service: Arc<dyn DatasetService> = self.service.clone();
            PublishCoordinator::new(
                self.config.clone(),
                self.store.clone(),
                Arc::new(StateManager::new_with_storage(self.markers.clone())),
                service.clone(),
                Arc::new(ResourceIdCache::new(service)),
                Arc::new(SchemaRegistry::standard().unwrap()),
            )
        }

        async fn catalogue(&self, docs: Vec<serde_json::Value>) {
            let docs = docs
                .into_iter()
                .map(|d| Document::from_json(d).unwrap())
                .collect();
            self.store.insert_many("ecatalogue", docs).await.unwrap();
        }
    }

    fn record(id: i64, record_type: &str, date: u32) -> serde_json::Value {
        json!({
            "_id": id,
            "SecRecordStatus": "Active",
            "ColRecordType": record_type,
            "AdmGUIDPreferredValue": format!("guid-{id}"),
            "exportFileDate": date,
        })
    }

    #[tokio::test]
    async fn test_publish_writes_every_matching_row() {
        let fixture = Fixture::new();
        fixture
            .catalogue(vec![
                record(1, "Specimen", 20140101),
                record(2, "Index Lot", 20140101),
                record(3, "Specimen", 20140108),
            ])
            .await;

        let summary = fixture
            .coordinator()
            .publish(DatasetVariant::Specimen, None)
            .await
            .unwrap();

        assert_eq!(summary.rows_extracted, 2);
        assert_eq!(summary.rows_written, 2);
        assert!(!summary.interrupted);

        let resource_id = summary.resource_id.unwrap();
        let rows = fixture.service.rows(&resource_id).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["occurrenceID"], json!("NHMUK:ecatalogue:guid-1"));
        assert_eq!(rows[1]["occurrenceID"], json!("NHMUK:ecatalogue:guid-3"));
    }

    #[tokio::test]
    async fn test_publish_for_date_requires_earlier_exports() {
        let fixture = Fixture::new();
        fixture.export_file("ecatalogue.export.20140101.gz");
        fixture.export_file("ecatalogue.export.20140108.gz");
        fixture.catalogue(vec![record(3, "Specimen", 20140108)]).await;

        let date = ExportDate::new(20140108).unwrap();
        let err = fixture
            .coordinator()
            .publish(DatasetVariant::Specimen, Some(date))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::DateOrdering { .. }));
        assert!(fixture.service.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_publish_for_date_only_sends_that_export() {
        let fixture = Fixture::new();
        fixture.export_file("ecatalogue.export.20140101.gz");
        fixture.export_file("ecatalogue.export.20140108.gz");
        fixture
            .catalogue(vec![
                record(1, "Specimen", 20140101),
                record(3, "Specimen", 20140108),
            ])
            .await;
        fixture
            .markers
            .touch("delete", ExportDate::new(20140101).unwrap(), false)
            .await
            .unwrap();

        let date = ExportDate::new(20140108).unwrap();
        let summary = fixture
            .coordinator()
            .publish(DatasetVariant::Specimen, Some(date))
            .await
            .unwrap();

        assert_eq!(summary.rows_written, 1);
        let rows = fixture.service.rows(&summary.resource_id.unwrap()).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["occurrenceID"], json!("NHMUK:ecatalogue:guid-3"));
    }

    #[tokio::test]
    async fn test_index_lots_published_to_own_resource() {
        let fixture = Fixture::new();
        fixture
            .catalogue(vec![
                record(7, "Index Lot", 20140101),
                record(8, "Specimen", 20140101),
            ])
            .await;

        let summary = fixture
            .coordinator()
            .publish(DatasetVariant::IndexLot, None)
            .await
            .unwrap();

        let rows = fixture.service.rows(&summary.resource_id.unwrap()).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["GUID"], json!("NHMUK:ecatalogue:guid-7"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let mut fixture = Fixture::new();
        fixture.config.application.dry_run = true;
        fixture.catalogue(vec![record(1, "Specimen", 20140101)]).await;

        let summary = fixture
            .coordinator()
            .publish(DatasetVariant::Specimen, None)
            .await
            .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.rows_written, 1);
        assert_eq!(fixture.service.call_count("package_create").await, 0);
        assert_eq!(fixture.service.call_count("datastore_upsert").await, 0);
    }

    #[tokio::test]
    async fn test_csv_target_appends_file() {
        let mut fixture = Fixture::new();
        let output = TempDir::new().unwrap();
        fixture.config.publish.target = WriteTarget::Csv;
        fixture.config.publish.csv_output_dir = output.path().to_path_buf();
        fixture
            .catalogue(vec![
                record(1, "Specimen", 20140101),
                record(2, "Specimen", 20140101),
            ])
            .await;

        let summary = fixture
            .coordinator()
            .publish(DatasetVariant::Specimen, None)
            .await
            .unwrap();

        assert_eq!(summary.rows_written, 2);
        let contents = std::fs::read_to_string(output.path().join("specimen.csv")).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(fixture.service.call_count("datastore_upsert").await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_after_current_batch() {
        let fixture = Fixture::new();
        fixture
            .catalogue((1..=3).map(|id| record(id, "Specimen", 20140101)).collect())
            .await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let summaries = fixture
            .coordinator()
            .with_shutdown_signal(shutdown_rx)
            .publish_all(&DatasetVariant::ALL, None)
            .await
            .unwrap();

        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].interrupted);
        assert_eq!(summaries[0].batches, 1);
    }

    #[tokio::test]
    async fn test_records_without_primary_key_are_skipped() {
        let fixture = Fixture::new();
        let mut first = record(1, "Specimen", 20140101);
        first["DarCatalogNumber"] = json!("A");
        first.as_object_mut().unwrap().remove("AdmGUIDPreferredValue");
        let mut second = record(2, "Specimen", 20140101);
        second["DarCatalogNumber"] = json!("B");
        second["AdmGUIDPreferredValue"] = json!("");
        fixture
            .catalogue(vec![first, second, record(3, "Specimen", 20140101)])
            .await;

        let summary = fixture
            .coordinator()
            .publish(DatasetVariant::Specimen, None)
            .await
            .unwrap();

        assert_eq!(summary.rows_extracted, 3);
        assert_eq!(summary.rows_skipped, 2);
        assert_eq!(summary.rows_written, 1);

        let rows = fixture.service.rows(&summary.resource_id.unwrap()).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["occurrenceID"], json!("NHMUK:ecatalogue:guid-3"));
        assert!(rows
            .iter()
            .all(|row| row["occurrenceID"] != json!("NHMUK:ecatalogue:")));
    }

    #[tokio::test]
    async fn test_batch_of_only_unkeyed_records_writes_nothing() {
        let fixture = Fixture::new();
        let mut orphan = record(1, "Specimen", 20140101);
        orphan.as_object_mut().unwrap().remove("AdmGUIDPreferredValue");
        fixture.catalogue(vec![orphan]).await;

        let summary = fixture
            .coordinator()
            .publish(DatasetVariant::Specimen, None)
            .await
            .unwrap();

        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(summary.rows_written, 0);
        assert_eq!(fixture.service.call_count("datastore_upsert").await, 0);
    }

    #[tokio::test]
    async fn test_stage_completion_reported_after_run() {
        let fixture = Fixture::new();
        fixture.catalogue(vec![record(1, "Specimen", 20140101)]).await;

        let coordinator = fixture.coordinator();
        assert!(!coordinator.is_complete(DatasetVariant::Specimen, None).await);

        coordinator
            .publish(DatasetVariant::Specimen, None)
            .await
            .unwrap();

        assert!(coordinator.is_complete(DatasetVariant::Specimen, None).await);
        assert!(!coordinator.is_complete(DatasetVariant::IndexLot, None).await);
        assert!(
            !coordinator
                .is_complete(DatasetVariant::Specimen, Some(ExportDate::new(20140101).unwrap()))
                .await
        );

        // Nothing persists: a new coordinator starts over
        let restarted = fixture.coordinator();
        assert!(!restarted.is_complete(DatasetVariant::Specimen, None).await);
    }

    #[tokio::test]
    async fn test_interrupted_stage_is_not_complete() {
        let fixture = Fixture::new();
        fixture
            .catalogue((1..=3).map(|id| record(id, "Specimen", 20140101)).collect())
            .await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        let coordinator = fixture.coordinator().with_shutdown_signal(shutdown_rx);

        let summary = coordinator
            .publish(DatasetVariant::Specimen, None)
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert!(!coordinator.is_complete(DatasetVariant::Specimen, None).await);
    }
}
