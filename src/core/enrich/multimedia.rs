//! Multimedia lookup
//!
//! The multimedia field of a catalogue record holds `;`-delimited
//! `emultimedia` IRNs covering every attached item, not just images. Each
//! IRN is checked against its multimedia record: only allowed MIME formats
//! with recorded dimensions resolve, and resolved items are rendered as
//! image URLs. Unresolved IRNs are dropped.

use crate::adapters::database::traits::{DocumentStore, Selection};
use crate::config::PublishConfig;
use crate::core::extract::coerce;
use crate::core::extract::{Batch, ColumnValues};
use crate::domain::{RecordId, Result, SyncError};
use std::collections::{BTreeSet, HashMap};

/// Collection holding multimedia records
pub const MULTIMEDIA_COLLECTION: &str = "emultimedia";

const MIME_FORMAT_FIELD: &str = "MulMimeFormat";
const WIDTH_FIELD: &str = "DocWidth";
const HEIGHT_FIELD: &str = "DocHeight";

/// Separator between rendered URLs in the output field
pub const URL_SEPARATOR: &str = "; ";

/// Allowed formats and URL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultimediaSettings {
    pub formats: Vec<String>,
    /// Template with `{irn}`, `{width}` and `{height}` placeholders
    pub url_template: String,
}

impl MultimediaSettings {
    pub fn from_config(config: &PublishConfig) -> Self {
        Self {
            formats: config.multimedia_formats.clone(),
            url_template: config.multimedia_url_template.clone(),
        }
    }

    /// Render the URL of one image
    pub fn url(&self, irn: i64, width: u32, height: u32) -> String {
        self.url_template
            .replace("{irn}", &irn.to_string())
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
    }
}

/// Effective size from a `;`-delimited list of derived image sizes
///
/// This is the second-largest value, or the only value of a single-entry
/// list. Returns `None` when the list is empty or any entry is not a number.
pub fn effective_dimension(list: &str) -> Option<u32> {
    let mut sizes = list
        .split(';')
        .map(|s| s.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    if sizes.is_empty() {
        return None;
    }
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes.get(1.min(sizes.len() - 1)).copied()
}

/// IRNs of a multimedia field, in order; non-numeric entries are skipped
pub fn parse_irns(field: &str) -> Vec<i64> {
    field
        .split(';')
        .filter_map(|s| s.trim().parse::<i64>().ok())
        .collect()
}

/// Replace the IRN lists of `field` with rendered image URLs
///
/// Returns the number of distinct IRNs that resolved.
///
/// # Errors
///
/// Returns an error if the field is missing or not text, or the store
/// lookup fails.
pub async fn enrich_multimedia(
    store: &(dyn DocumentStore + Send + Sync),
    batch: &mut Batch,
    field: &str,
    settings: &MultimediaSettings,
) -> Result<usize> {
    let rows: Vec<Vec<i64>> = match batch.column(field).map(|c| &c.values) {
        Some(ColumnValues::Text(values)) => values.iter().map(|v| parse_irns(v)).collect(),
        _ => {
            return Err(SyncError::Validation(format!(
                "Multimedia field '{field}' is not a text column"
            )))
        }
    };

    let unique: BTreeSet<i64> = rows.iter().flatten().copied().collect();
    let urls = if unique.is_empty() {
        HashMap::new()
    } else {
        resolve(store, &unique, settings).await?
    };

    tracing::debug!(
        field,
        requested = unique.len(),
        resolved = urls.len(),
        "Resolved multimedia"
    );

    if let Some(ColumnValues::Text(values)) = batch.column_mut(field).map(|c| &mut c.values) {
        for (value, irns) in values.iter_mut().zip(&rows) {
            *value = irns
                .iter()
                .filter_map(|irn| urls.get(irn).map(String::as_str))
                .collect::<Vec<_>>()
                .join(URL_SEPARATOR);
        }
    }

    Ok(urls.len())
}

async fn resolve(
    store: &(dyn DocumentStore + Send + Sync),
    irns: &BTreeSet<i64>,
    settings: &MultimediaSettings,
) -> Result<HashMap<i64, String>> {
    let ids: Vec<RecordId> = irns.iter().copied().map(RecordId::new).collect();
    let selection = Selection::new()
        .one_of(MIME_FORMAT_FIELD, settings.formats.iter().map(String::as_str))
        .exists(HEIGHT_FIELD)
        .exists(WIDTH_FIELD);

    let documents = store
        .find_by_ids(MULTIMEDIA_COLLECTION, &ids, &selection)
        .await?;

    Ok(documents
        .iter()
        .filter_map(|doc| {
            let width = effective_dimension(&coerce::to_text(doc.get(WIDTH_FIELD).as_ref(), None))?;
            let height =
                effective_dimension(&coerce::to_text(doc.get(HEIGHT_FIELD).as_ref(), None))?;
            let irn = doc.id.value();
            Some((irn, settings.url(irn, width, height)))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::memory::InMemoryDocumentStore;
    use crate::datasets::ColumnTriple;
    use crate::domain::Document;
    use serde_json::json;
    use test_case::test_case;

    fn settings() -> MultimediaSettings {
        MultimediaSettings {
            formats: vec!["jpeg".into(), "jp2".into()],
            url_template: "http://media/{irn}?w={width}&h={height}".into(),
        }
    }

    #[test_case("100;50;200" => Some(100); "second largest")]
    #[test_case("640" => Some(640); "single entry")]
    #[test_case(" 90 ; 3000 " => Some(90); "whitespace")]
    #[test_case("" => None; "empty")]
    #[test_case("100;abc" => None; "unparseable")]
    fn test_effective_dimension(list: &str) -> Option<u32> {
        effective_dimension(list)
    }

    #[test]
    fn test_parse_irns() {
        assert_eq!(parse_irns("1; 2;;x;3"), vec![1, 2, 3]);
        assert!(parse_irns("").is_empty());
    }

    #[tokio::test]
    async fn test_enrich_multimedia_renders_urls_in_row_order() {
        let store = InMemoryDocumentStore::new();
        let media = vec![
            json!({"_id": 10, "MulMimeFormat": "jpeg", "DocWidth": "100;50;200", "DocHeight": "80;40;160"}),
            json!({"_id": 11, "MulMimeFormat": "tiff", "DocWidth": "100;50", "DocHeight": "100;50"}),
            json!({"_id": 12, "MulMimeFormat": "jp2", "DocWidth": "300", "DocHeight": "200"}),
            json!({"_id": 13, "MulMimeFormat": "jpeg"}),
        ];
        store
            .insert_many(
                MULTIMEDIA_COLLECTION,
                media.into_iter().map(|d| Document::from_json(d).unwrap()).collect(),
            )
            .await
            .unwrap();

        let triples = vec![
            ColumnTriple::new("ecatalogue._id", "_id", "int32").unwrap(),
            ColumnTriple::new("ecatalogue.MulMultiMediaRef", "associatedMedia", "string").unwrap(),
        ];
        let docs = vec![
            Document::from_json(json!({"_id": 1, "MulMultiMediaRef": [12, 10, 11]})).unwrap(),
            Document::from_json(json!({"_id": 2, "MulMultiMediaRef": "13"})).unwrap(),
            Document::from_json(json!({"_id": 3})).unwrap(),
        ];
        let mut batch = Batch::from_documents(&triples, "ecatalogue", &docs);

        let resolved = enrich_multimedia(&store, &mut batch, "associatedMedia", &settings())
            .await
            .unwrap();
        assert_eq!(resolved, 2);

        assert_eq!(
            batch.column("associatedMedia").unwrap().values,
            ColumnValues::Text(vec![
                "http://media/12?w=300&h=200; http://media/10?w=100&h=80".into(),
                String::new(),
                String::new(),
            ])
        );
    }

    #[tokio::test]
    async fn test_enrich_multimedia_rejects_non_text_field() {
        let store = InMemoryDocumentStore::new();
        let triples = vec![ColumnTriple::new("ecatalogue._id", "_id", "int32").unwrap()];
        let mut batch = Batch::from_documents(&triples, "ecatalogue", &[]);
        assert!(enrich_multimedia(&store, &mut batch, "_id", &settings())
            .await
            .is_err());
    }
}
