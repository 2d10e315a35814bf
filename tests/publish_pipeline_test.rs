//! Integration tests for the publishing pipeline
//!
//! Covers batch extraction, value coercion, export-date ordering, dataset
//! setup on the remote service and both write targets.

use catalogue_sync::adapters::ckan::{DatasetService, FieldSpec, InMemoryDatasetService};
use catalogue_sync::adapters::database::{
    DocumentStore, InMemoryDocumentStore, InMemoryMarkerStore, MarkerStore,
};
use catalogue_sync::config::{parse_config, SyncConfig};
use catalogue_sync::core::extract::{Batch, BatchExtractor};
use catalogue_sync::core::publish::{
    BatchWriter, CsvWriter, DatasetSynchronizer, PublishCoordinator, ResourceIdCache,
};
use catalogue_sync::core::state::{check_export_ordering, StateManager, DELETE_TASK_ID};
use catalogue_sync::datasets::{DatasetDefinition, DatasetVariant, SchemaRegistry};
use catalogue_sync::domain::{Document, ExportDate, ResourceId, SyncError};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tempfile::TempDir;

fn date(value: u32) -> ExportDate {
    ExportDate::new(value).unwrap()
}

fn dates(values: &[u32]) -> BTreeSet<ExportDate> {
    values.iter().map(|v| date(*v)).collect()
}

fn small_specimens() -> DatasetDefinition {
    DatasetDefinition::builder(DatasetVariant::Specimen)
        .package("collection-specimens", "Collection specimens")
        .resource("Specimens", "Specimen records")
        .primary_key("occurrenceID")
        .block_size(2)
        .column("ecatalogue._id", "_id", "int32")
        .column("ecatalogue.AdmGUIDPreferredValue", "occurrenceID", "string:36")
        .column("ecatalogue.DarIndividualCount", "individualCount", "int32")
        .column("ecatalogue.DarDecimalLatitude", "decimalLatitude", "float64")
        .column("ecatalogue.DarCountry", "country", "string:7")
        .column("ecatalogue.DarOtherCatalogNumbers", "otherCatalogNumbers", "string")
        .build()
        .unwrap()
}

fn catalogue_record(id: i64, status: &str) -> Value {
    json!({
        "_id": id,
        "SecRecordStatus": status,
        "ColRecordType": "Specimen",
        "AdmGUIDPreferredValue": format!("guid-{id}"),
        "exportFileDate": 20140101,
    })
}

struct Pipeline {
    exports: TempDir,
    config: SyncConfig,
    store: Arc<InMemoryDocumentStore>,
    markers: Arc<InMemoryMarkerStore>,
    service: Arc<InMemoryDatasetService>,
}

impl Pipeline {
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

[publish]
write_batch_size = 2
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

    fn coordinator(&self, registry: SchemaRegistry) -> PublishCoordinator {
        let service: Arc<dyn DatasetService> = self.service.clone();
        PublishCoordinator::new(
            self.config.clone(),
            self.store.clone(),
            Arc::new(StateManager::new_with_storage(self.markers.clone())),
            service.clone(),
            Arc::new(ResourceIdCache::new(service)),
            Arc::new(registry),
        )
    }

    fn synchronizer(&self) -> DatasetSynchronizer {
        let service: Arc<dyn DatasetService> = self.service.clone();
        DatasetSynchronizer::new(service.clone(), Arc::new(ResourceIdCache::new(service)), false)
    }

    async fn catalogue(&self, docs: Vec<Value>) {
        let docs = docs
            .into_iter()
            .map(|d| Document::from_json(d).unwrap())
            .collect();
        self.store.insert_many("ecatalogue", docs).await.unwrap();
    }
}

#[tokio::test]
async fn test_batches_cover_every_active_record_once() {
    let pipeline = Pipeline::new();
    let mut docs: Vec<Value> = (1..=5).map(|id| catalogue_record(id, "Active")).collect();
    docs.push(catalogue_record(6, "Inactive"));
    pipeline.catalogue(docs).await;

    let registry = SchemaRegistry::new(vec![small_specimens()]).unwrap();
    let summary = pipeline
        .coordinator(registry)
        .publish(DatasetVariant::Specimen, None)
        .await
        .unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.rows_extracted, 5);
    assert_eq!(summary.rows_written, 5);

    let rows = pipeline.service.rows(&summary.resource_id.unwrap()).await;
    let keys: HashSet<_> = rows
        .iter()
        .map(|r| r["occurrenceID"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys.len(), 5);
    assert!(!keys.contains("NHMUK:ecatalogue:guid-6"));
    // One upsert per batch at write_batch_size = 2
    assert_eq!(pipeline.service.call_count("datastore_upsert").await, 3);
}

#[tokio::test]
async fn test_extractor_blocks_are_disjoint_and_ordered() {
    let pipeline = Pipeline::new();
    pipeline
        .catalogue((1..=5).map(|id| catalogue_record(id, "Active")).collect())
        .await;

    let mut extractor = BatchExtractor::new(
        pipeline.store.clone(),
        Arc::new(small_specimens()),
        "Active",
        None,
    );

    let mut seen = Vec::new();
    while let Some(batch) = extractor.next_batch().await.unwrap() {
        assert!(batch.len() <= 2);
        seen.extend(batch.ids().iter().map(|id| id.value()));
    }

    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    assert_eq!(extractor.progress(), (3, 5));
    assert!(extractor.next_batch().await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_and_malformed_values_use_fill_values() {
    let pipeline = Pipeline::new();
    pipeline
        .catalogue(vec![
            json!({
                "_id": 1,
                "SecRecordStatus": "Active",
                "AdmGUIDPreferredValue": "guid-1",
                "DarIndividualCount": "12",
                "DarDecimalLatitude": 51.5,
                "DarCountry": "United Kingdom",
                "DarOtherCatalogNumbers": ["BM-1", "BM-2"],
            }),
            json!({
                "_id": 2,
                "SecRecordStatus": "Active",
                "AdmGUIDPreferredValue": "guid-2",
                "DarIndividualCount": "several",
                "DarDecimalLatitude": null,
            }),
        ])
        .await;

    let registry = SchemaRegistry::new(vec![small_specimens()]).unwrap();
    let summary = pipeline
        .coordinator(registry)
        .publish(DatasetVariant::Specimen, None)
        .await
        .unwrap();

    let rows = pipeline.service.rows(&summary.resource_id.unwrap()).await;
    assert_eq!(rows[0]["individualCount"], json!(12));
    assert_eq!(rows[0]["decimalLatitude"], json!(51.5));
    assert_eq!(rows[0]["country"], json!("United "));
    assert_eq!(rows[0]["otherCatalogNumbers"], json!("BM-1;BM-2"));

    assert_eq!(rows[1]["individualCount"], json!(0));
    assert_eq!(rows[1]["decimalLatitude"], Value::Null);
    assert_eq!(rows[1]["country"], json!(""));
    assert!(!rows[1].contains_key("_id"));
}

#[tokio::test]
async fn test_export_ordering_requires_every_earlier_marker() {
    let markers = Arc::new(InMemoryMarkerStore::new());
    let state = StateManager::new_with_storage(markers.clone());
    let exports = dates(&[20140101, 20140108, 20140115]);

    let err = state
        .ensure_export_date(&exports, date(20140115))
        .await
        .unwrap_err();
    match err {
        SyncError::DateOrdering { missing } => assert_eq!(missing, vec![20140101, 20140108]),
        other => panic!("unexpected error {other:?}"),
    }

    markers.touch(DELETE_TASK_ID, date(20140101), false).await.unwrap();
    markers.touch(DELETE_TASK_ID, date(20140108), false).await.unwrap();
    state
        .ensure_export_date(&exports, date(20140115))
        .await
        .unwrap();

    // Later markers do not matter
    let processed = dates(&[20140101, 20140108, 20140122]);
    assert!(check_export_ordering(&exports, &processed, date(20140115)).is_ok());
}

#[test]
fn test_marker_without_export_file_is_a_state_error() {
    let exports = dates(&[20140108]);
    let processed = dates(&[20140101, 20140108]);

    let err = check_export_ordering(&exports, &processed, date(20140115)).unwrap_err();

    assert!(matches!(err, SyncError::State(_)));
}

#[tokio::test]
async fn test_dated_publish_checks_export_directory() {
    let pipeline = Pipeline::new();
    std::fs::write(
        pipeline.exports.path().join("ecatalogue.export.20140101.gz"),
        "",
    )
    .unwrap();
    pipeline.catalogue(vec![catalogue_record(1, "Active")]).await;

    let registry = SchemaRegistry::new(vec![small_specimens()]).unwrap();
    let coordinator = pipeline.coordinator(registry);

    // The first export has no predecessors
    let summary = coordinator
        .publish(DatasetVariant::Specimen, Some(date(20140101)))
        .await
        .unwrap();
    assert_eq!(summary.rows_written, 1);

    let err = coordinator
        .publish(DatasetVariant::Specimen, Some(date(20140108)))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::DateOrdering { .. }));
}

#[tokio::test]
async fn test_dataset_setup_is_idempotent() {
    let pipeline = Pipeline::new();
    let definition = SchemaRegistry::standard()
        .unwrap()
        .get(DatasetVariant::Specimen)
        .unwrap();

    let first = pipeline
        .synchronizer()
        .ensure_resource(&definition)
        .await
        .unwrap();
    let second = pipeline
        .synchronizer()
        .ensure_resource(&definition)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(pipeline.service.call_count("package_create").await, 1);
    assert_eq!(pipeline.service.call_count("datastore_create").await, 1);
    assert_eq!(pipeline.service.call_count("create_geom_columns").await, 1);
    assert!(pipeline.service.has_geometry(&first).await);
}

#[tokio::test]
async fn test_existing_resource_with_other_fields_is_rejected() {
    let pipeline = Pipeline::new();
    pipeline
        .service
        .seed_resource(
            "collection-specimens",
            "Specimens",
            vec![FieldSpec::new("occurrenceID", "citext")],
            Some("occurrenceID"),
        )
        .await;
    let definition = SchemaRegistry::standard()
        .unwrap()
        .get(DatasetVariant::Specimen)
        .unwrap();

    let err = pipeline
        .synchronizer()
        .ensure_resource(&definition)
        .await
        .unwrap_err();

    match err {
        SyncError::SchemaMismatch { actual, expected, .. } => {
            assert_eq!(actual, vec!["occurrenceID"]);
            assert_eq!(expected, definition.output_field_names());
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(pipeline.service.call_count("datastore_create").await, 0);
}

#[tokio::test]
async fn test_csv_writer_appends_rows_and_builds_copy_command() {
    let output = TempDir::new().unwrap();
    let definition = small_specimens();
    let resource_id = ResourceId::new("resource-0001").unwrap();
    let docs = vec![
        Document::from_json(json!({
            "_id": 1,
            "AdmGUIDPreferredValue": "guid-1",
            "DarIndividualCount": 2,
            "DarCountry": "Chile, Santiago",
        }))
        .unwrap(),
        Document::from_json(json!({"_id": 2, "AdmGUIDPreferredValue": "guid-2"})).unwrap(),
    ];
    let batch = Batch::from_documents(definition.columns(), "ecatalogue", &docs);

    let mut writer = CsvWriter::new(
        output.path(),
        &definition,
        Some(date(20140108)),
        resource_id,
        false,
    );
    assert_eq!(writer.write(&batch).await.unwrap(), 2);
    writer.finish().await.unwrap();

    let path = output.path().join("specimen-20140108.csv");
    assert_eq!(writer.path(), path.as_path());
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "guid-1,2,,\"Chile, \",\nguid-2,0,,,\n");

    let copy = writer.copy_command();
    assert!(copy.starts_with("COPY \"resource-0001\" (\"occurrenceID\",\"individualCount\""));
    assert!(copy.contains(&path.display().to_string()));
}
