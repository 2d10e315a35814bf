//! PostgreSQL row models
//!
//! Row shapes of the `documents` and `completion_markers` tables and their
//! conversion to domain types.

use crate::adapters::database::traits::CompletionMarker;
use crate::domain::{Document, DocumentStoreError, ExportDate, Result, SyncError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;

/// Row of the `documents` table
#[derive(Debug, Clone)]
pub struct PostgreSQLDocument {
    /// Collection (KE module) name
    pub collection: String,

    /// Record IRN
    pub id: i64,

    /// Every field except `_id`
    pub doc: Value,
}

impl PostgreSQLDocument {
    /// Build a row from a domain document
    pub fn from_domain(collection: &str, document: Document) -> Self {
        Self {
            collection: collection.to_string(),
            id: document.id.value(),
            doc: Value::Object(document.fields),
        }
    }

    /// Read `id` and `doc` columns from a query row
    pub fn from_row(collection: &str, row: &Row) -> Result<Self> {
        Ok(Self {
            collection: collection.to_string(),
            id: row
                .try_get("id")
                .map_err(|e| DocumentStoreError::InvalidDocument(e.to_string()))?,
            doc: row
                .try_get("doc")
                .map_err(|e| DocumentStoreError::InvalidDocument(e.to_string()))?,
        })
    }

    /// Convert to a domain document
    ///
    /// # Errors
    ///
    /// Returns an error if the stored `doc` is not a JSON object.
    pub fn to_domain(self) -> Result<Document> {
        match self.doc {
            Value::Object(fields) => Ok(Document::new(self.id, fields)),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "{}/{} holds {} instead of an object",
                self.collection,
                self.id,
                json_kind(&other)
            ))
            .into()),
        }
    }
}

/// Row of the `completion_markers` table
#[derive(Debug, Clone)]
pub struct PostgreSQLMarker {
    pub task_id: String,
    pub date: i32,
    pub created_at: DateTime<Utc>,
}

impl PostgreSQLMarker {
    pub fn from_domain(marker: &CompletionMarker) -> Result<Self> {
        Ok(Self {
            task_id: marker.task_id.clone(),
            date: date_to_sql(marker.date)?,
            created_at: marker.created_at,
        })
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        let invalid = |e: tokio_postgres::Error| SyncError::State(e.to_string());
        Ok(Self {
            task_id: row.try_get("task_id").map_err(invalid)?,
            date: row.try_get("date").map_err(invalid)?,
            created_at: row.try_get("created_at").map_err(invalid)?,
        })
    }

    pub fn to_domain(self) -> Result<CompletionMarker> {
        Ok(CompletionMarker {
            task_id: self.task_id,
            date: date_from_sql(self.date)?,
            created_at: self.created_at,
        })
    }
}

/// Export dates are stored as `INTEGER`
pub fn date_to_sql(date: ExportDate) -> Result<i32> {
    i32::try_from(date.value())
        .map_err(|_| SyncError::State(format!("Export date {date} out of range")))
}

pub fn date_from_sql(value: i32) -> Result<ExportDate> {
    let value = u32::try_from(value)
        .map_err(|_| SyncError::State(format!("Negative export date {value} in marker table")))?;
    ExportDate::new(value).map_err(SyncError::State)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
