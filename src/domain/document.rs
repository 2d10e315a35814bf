//! Document store records
//!
//! A [`Document`] is one KE EMu record as it sits in the document store: an
//! integer `_id` (the IRN) plus every exported field as JSON.

use crate::domain::ids::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name holding the document identifier
pub const ID_FIELD: &str = "_id";

/// A document-store record keyed by its KE EMu IRN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Record identifier (`_id`)
    pub id: RecordId,

    /// All source fields except `_id`
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a document from an id and its fields
    pub fn new(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a document from a JSON object carrying an integer `_id`
    ///
    /// # Errors
    ///
    /// Returns an error message if the value is not an object or `_id` is
    /// missing or not an integer.
    pub fn from_json(value: Value) -> Result<Self, String> {
        let Value::Object(mut fields) = value else {
            return Err("Document must be a JSON object".to_string());
        };

        let id = fields
            .remove(ID_FIELD)
            .and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .ok_or_else(|| "Document is missing an integer _id".to_string())?;

        Ok(Self::new(id, fields))
    }

    /// Look up a field; `_id` resolves to the record identifier
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == ID_FIELD {
            return Some(Value::from(self.id.value()));
        }
        self.fields.get(field).cloned()
    }

    /// Look up a field as a string slice
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Whether the document carries the field with a non-null value
    pub fn has(&self, field: &str) -> bool {
        field == ID_FIELD || self.fields.get(field).is_some_and(|v| !v.is_null())
    }
}

/// One entry of the `eaudit` deleted-records export
///
/// Names the KE module the record was deleted from (`AudTable`) and the IRN
/// of the deleted record (`AudKey`). Consumed once, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditDeleteRecord {
    /// Source module / collection name
    pub collection: String,

    /// Identifier of the deleted record
    pub record_id: RecordId,
}

impl AuditDeleteRecord {
    /// Create a new audit-delete record
    pub fn new(collection: impl Into<String>, record_id: impl Into<RecordId>) -> Self {
        Self {
            collection: collection.into(),
            record_id: record_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_from_json() {
        let doc = Document::from_json(json!({"_id": 42, "ColRecordType": "Specimen"})).unwrap();
        assert_eq!(doc.id.value(), 42);
        assert_eq!(doc.get_str("ColRecordType"), Some("Specimen"));
        assert!(!doc.fields.contains_key("_id"));
    }

    #[test]
    fn test_document_from_json_string_id() {
        let doc = Document::from_json(json!({"_id": "7"})).unwrap();
        assert_eq!(doc.id.value(), 7);
    }

    #[test]
    fn test_document_from_json_requires_id() {
        assert!(Document::from_json(json!({"ColRecordType": "Specimen"})).is_err());
        assert!(Document::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_document_get_id_field() {
        let doc = Document::new(RecordId::new(5), Map::new());
        assert_eq!(doc.get("_id"), Some(json!(5)));
        assert!(doc.has("_id"));
        assert!(!doc.has("DarCatalogNumber"));
    }

    #[test]
    fn test_document_has_ignores_null() {
        let doc = Document::from_json(json!({"_id": 1, "DocWidth": null})).unwrap();
        assert!(!doc.has("DocWidth"));
    }
}
