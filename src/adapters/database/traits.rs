//! Document store abstraction traits
//!
//! This module defines the traits that storage backends must implement to
//! work with catalogue-sync: [`DocumentStore`] for the ingested KE EMu
//! records and [`MarkerStore`] for per-date completion markers.

use crate::domain::{Document, ExportDate, RecordId, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One predicate of a [`Selection`]
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the given JSON value
    Equals { field: String, value: Value },
    /// Field equals one of the values
    In { field: String, values: Vec<Value> },
    /// Field is absent or equals none of the values
    NotIn { field: String, values: Vec<Value> },
    /// Field is present with a non-null value
    Exists(String),
    /// Document `_id` is one of the ids
    IdIn(Vec<RecordId>),
}

impl Condition {
    /// Evaluate the condition against a document
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Condition::Equals { field, value } => document.get(field).as_ref() == Some(value),
            Condition::In { field, values } => document
                .get(field)
                .is_some_and(|v| values.contains(&v)),
            Condition::NotIn { field, values } => !document
                .get(field)
                .is_some_and(|v| values.contains(&v)),
            Condition::Exists(field) => document.has(field),
            Condition::IdIn(ids) => ids.contains(&document.id),
        }
    }
}

/// Conjunction of conditions selecting documents from a collection
///
/// ```
/// use catalogue_sync::adapters::database::Selection;
///
/// let selection = Selection::new()
///     .equals("SecRecordStatus", "Active")
///     .exists("DocWidth");
/// assert_eq!(selection.conditions().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    conditions: Vec<Condition>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn one_of<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn none_of<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::NotIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn exists(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::Exists(field.into()));
        self
    }

    pub fn id_in(mut self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.conditions
            .push(Condition::IdIn(ids.into_iter().collect()));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether every condition holds for the document
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }
}

/// Document store holding ingested KE EMu records, one collection per module
///
/// Scans are keyset paginated on `_id`: [`DocumentStore::find_block`] returns
/// documents with `_id > after` in ascending order, so a sequence of blocks
/// is disjoint and covers the full selection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Test the store connection
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn test_connection(&self) -> Result<()>;

    /// Fetch the next block of matching documents
    ///
    /// # Arguments
    ///
    /// * `collection` - Collection to scan
    /// * `selection` - Conditions every returned document satisfies
    /// * `after` - Exclusive lower bound on `_id`; `None` starts from the beginning
    /// * `limit` - Maximum number of documents returned
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn find_block(
        &self,
        collection: &str,
        selection: &Selection,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<Document>>;

    /// Fetch the documents with the given ids that also match `selection`
    ///
    /// Missing ids are not an error; the result holds what was found.
    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[RecordId],
        selection: &Selection,
    ) -> Result<Vec<Document>>;

    /// Fetch one document by id
    async fn find_one(&self, collection: &str, id: RecordId) -> Result<Option<Document>>;

    /// Insert or replace documents
    ///
    /// # Returns
    ///
    /// Number of documents written.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize>;

    /// Delete a document by id
    ///
    /// # Returns
    ///
    /// `true` if a document was removed, `false` if none existed.
    async fn delete_by_id(&self, collection: &str, id: RecordId) -> Result<bool>;
}

/// Completion marker for one stage run on one export date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    /// Stage identifier, e.g. `delete`
    pub task_id: String,

    /// Export date the stage processed
    pub date: ExportDate,

    /// When the marker was written
    pub created_at: DateTime<Utc>,
}

impl CompletionMarker {
    pub fn new(task_id: impl Into<String>, date: ExportDate) -> Self {
        Self {
            task_id: task_id.into(),
            date,
            created_at: Utc::now(),
        }
    }
}

/// Persistence for completion markers
#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Record that `task_id` completed for `date`
    ///
    /// Touching an existing marker is not an error.
    ///
    /// # Arguments
    ///
    /// * `dry_run` - If true, log and skip the write
    async fn touch(&self, task_id: &str, date: ExportDate, dry_run: bool) -> Result<()>;

    /// Whether `task_id` has a marker for `date`
    async fn exists(&self, task_id: &str, date: ExportDate) -> Result<bool>;

    /// All dates `task_id` has a marker for
    async fn marker_dates(&self, task_id: &str) -> Result<BTreeSet<ExportDate>>;

    /// Every stored marker
    async fn all_markers(&self) -> Result<Vec<CompletionMarker>>;
}
