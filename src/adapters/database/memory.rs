//! In-memory storage backends
//!
//! Backends holding everything in process memory, used by the `memory`
//! store backend for local runs and by the test suite.

use crate::adapters::database::traits::{CompletionMarker, DocumentStore, MarkerStore, Selection};
use crate::domain::{Document, ExportDate, RecordId, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Document store keeping collections in ordered maps keyed by `_id`
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<RecordId, Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held in `collection`
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn find_block(
        &self,
        collection: &str,
        selection: &Selection,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let range = match after {
            Some(after) => documents.range((
                std::ops::Bound::Excluded(after),
                std::ops::Bound::Unbounded,
            )),
            None => documents.range(..),
        };

        Ok(range
            .map(|(_, doc)| doc)
            .filter(|doc| selection.matches(doc))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[RecordId],
        selection: &Selection,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let unique: BTreeSet<&RecordId> = ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| documents.get(id))
            .filter(|doc| selection.matches(doc))
            .cloned()
            .collect())
    }

    async fn find_one(&self, collection: &str, id: RecordId) -> Result<Option<Document>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize> {
        let count = documents.len();
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();
        for document in documents {
            target.insert(document.id, document);
        }
        Ok(count)
    }

    async fn delete_by_id(&self, collection: &str, id: RecordId) -> Result<bool> {
        Ok(self
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(&id))
            .is_some())
    }
}

/// Marker store keeping one marker per `(task_id, date)`
#[derive(Debug, Default)]
pub struct InMemoryMarkerStore {
    markers: RwLock<BTreeMap<(String, ExportDate), CompletionMarker>>,
}

impl InMemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarkerStore for InMemoryMarkerStore {
    async fn touch(&self, task_id: &str, date: ExportDate, dry_run: bool) -> Result<()> {
        if dry_run {
            tracing::info!(task_id, date = %date, "DRY RUN: Would write completion marker");
            return Ok(());
        }

        self.markers
            .write()
            .await
            .entry((task_id.to_string(), date))
            .or_insert_with(|| CompletionMarker::new(task_id, date));
        Ok(())
    }

    async fn exists(&self, task_id: &str, date: ExportDate) -> Result<bool> {
        Ok(self
            .markers
            .read()
            .await
            .contains_key(&(task_id.to_string(), date)))
    }

    async fn marker_dates(&self, task_id: &str) -> Result<BTreeSet<ExportDate>> {
        Ok(self
            .markers
            .read()
            .await
            .keys()
            .filter(|(task, _)| task == task_id)
            .map(|(_, date)| *date)
            .collect())
    }

    async fn all_markers(&self) -> Result<Vec<CompletionMarker>> {
        Ok(self.markers.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: i64, record_type: &str) -> Document {
        Document::from_json(json!({"_id": id, "ColRecordType": record_type})).unwrap()
    }

    #[tokio::test]
    async fn test_find_block_keyset_pagination() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_many("ecatalogue", (1..=5).map(|i| doc(i, "Specimen")).collect())
            .await
            .unwrap();

        let first = store
            .find_block("ecatalogue", &Selection::new(), None, 2)
            .await
            .unwrap();
        assert_eq!(first.iter().map(|d| d.id.value()).collect::<Vec<_>>(), vec![1, 2]);

        let second = store
            .find_block("ecatalogue", &Selection::new(), Some(RecordId::new(2)), 2)
            .await
            .unwrap();
        assert_eq!(second.iter().map(|d| d.id.value()).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_find_block_applies_selection() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_many(
                "ecatalogue",
                vec![doc(1, "Specimen"), doc(2, "Index Lot"), doc(3, "Specimen")],
            )
            .await
            .unwrap();

        let selection = Selection::new().equals("ColRecordType", "Specimen");
        let docs = store
            .find_block("ecatalogue", &selection, None, 10)
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_missing() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_many("emultimedia", vec![doc(1, "x"), doc(2, "x")])
            .await
            .unwrap();

        let ids = [RecordId::new(2), RecordId::new(9), RecordId::new(2)];
        let docs = store
            .find_by_ids("emultimedia", &ids, &Selection::new())
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_many("ecatalogue", vec![doc(42, "Specimen")])
            .await
            .unwrap();

        assert!(store.delete_by_id("ecatalogue", RecordId::new(42)).await.unwrap());
        assert!(!store.delete_by_id("ecatalogue", RecordId::new(42)).await.unwrap());
        assert!(store.find_one("ecatalogue", RecordId::new(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_marker_store() {
        let store = InMemoryMarkerStore::new();
        let date = ExportDate::new(20140522).unwrap();

        store.touch("delete", date, true).await.unwrap();
        assert!(!store.exists("delete", date).await.unwrap());

        store.touch("delete", date, false).await.unwrap();
        store.touch("delete", date, false).await.unwrap();
        assert!(store.exists("delete", date).await.unwrap());
        assert_eq!(store.all_markers().await.unwrap().len(), 1);
        assert!(store.marker_dates("publish").await.unwrap().is_empty());
    }
}
