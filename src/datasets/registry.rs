//! Dataset, collection and delete-dispatch registries
//!
//! Three static lookup tables the pipeline is driven by:
//! - [`SchemaRegistry`]: dataset variant to its [`DatasetDefinition`]
//! - [`CollectionRegistry`]: KE module name to tracked document-store collection
//! - [`DeleteDispatch`]: ordered record-type rules choosing the dataset a
//!   catalogue record was published to

use crate::datasets::definition::{DatasetDefinition, DatasetVariant, CATALOGUE_COLLECTION};
use crate::datasets::{artefact, indexlot, specimen, ARTEFACT_RECORD_TYPE, INDEX_LOT_RECORD_TYPE};
use crate::domain::{Document, Result, SyncError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field holding a catalogue record's type
pub const RECORD_TYPE_FIELD: &str = "ColRecordType";

/// Owns every dataset definition for the lifetime of the process
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    definitions: BTreeMap<DatasetVariant, Arc<DatasetDefinition>>,
}

impl SchemaRegistry {
    /// Registry holding the built-in specimen, index lot and artefact tables
    ///
    /// # Errors
    ///
    /// Returns an error if any static table violates a definition invariant.
    pub fn standard() -> Result<Self> {
        Self::new(vec![
            specimen::definition()?,
            indexlot::definition()?,
            artefact::definition()?,
        ])
    }

    /// Registry over caller-supplied definitions
    ///
    /// # Errors
    ///
    /// Returns an error if two definitions share a variant or dataset name.
    pub fn new(definitions: Vec<DatasetDefinition>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for definition in definitions {
            let variant = definition.variant();
            if map
                .values()
                .any(|d: &Arc<DatasetDefinition>| d.name() == definition.name())
            {
                return Err(SyncError::Definition(format!(
                    "Dataset name '{}' registered twice",
                    definition.name()
                )));
            }
            if map.insert(variant, Arc::new(definition)).is_some() {
                return Err(SyncError::Definition(format!(
                    "Dataset variant '{variant}' registered twice"
                )));
            }
        }
        Ok(Self { definitions: map })
    }

    /// Definition for `variant`
    ///
    /// # Errors
    ///
    /// Returns an error if the variant has no registered definition.
    pub fn get(&self, variant: DatasetVariant) -> Result<Arc<DatasetDefinition>> {
        self.definitions.get(&variant).cloned().ok_or_else(|| {
            SyncError::Definition(format!("No dataset definition registered for '{variant}'"))
        })
    }

    /// All definitions in variant order
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<DatasetDefinition>> {
        self.definitions.values()
    }
}

/// Maps KE module names to the document-store collections that are tracked
#[derive(Debug, Clone)]
pub struct CollectionRegistry {
    collections: Vec<String>,
}

impl CollectionRegistry {
    /// Modules imported into the document store
    pub fn standard() -> Self {
        Self::new([
            CATALOGUE_COLLECTION,
            "etaxonomy",
            "emultimedia",
            "ecollectionindex",
            "ecollectionevents",
            "esites",
        ])
    }

    pub fn new<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collections: collections.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve a module name to its collection; `None` when untracked
    pub fn resolve(&self, module: &str) -> Option<&str> {
        self.collections
            .iter()
            .find(|c| c.as_str() == module)
            .map(String::as_str)
    }

    /// Whether records of this collection are published remotely
    pub fn is_catalogue(&self, collection: &str) -> bool {
        collection == CATALOGUE_COLLECTION
    }

    pub fn collections(&self) -> &[String] {
        &self.collections
    }
}

/// One `(predicate, variant)` entry of the delete dispatch list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRule {
    /// Record type the catalogue record must carry
    pub record_type: String,
    pub variant: DatasetVariant,
}

impl DispatchRule {
    pub fn new(record_type: impl Into<String>, variant: DatasetVariant) -> Self {
        Self {
            record_type: record_type.into(),
            variant,
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.get_str(RECORD_TYPE_FIELD) == Some(self.record_type.as_str())
    }
}

/// Ordered first-match dispatch with an explicit default
#[derive(Debug, Clone)]
pub struct DeleteDispatch {
    rules: Vec<DispatchRule>,
    default: DatasetVariant,
}

impl DeleteDispatch {
    /// Index lot before artefact, falling back to specimen
    pub fn standard() -> Self {
        Self::new(
            vec![
                DispatchRule::new(INDEX_LOT_RECORD_TYPE, DatasetVariant::IndexLot),
                DispatchRule::new(ARTEFACT_RECORD_TYPE, DatasetVariant::Artefact),
            ],
            DatasetVariant::Specimen,
        )
    }

    pub fn new(rules: Vec<DispatchRule>, default: DatasetVariant) -> Self {
        Self { rules, default }
    }

    /// Variant of the first matching rule, or the default
    pub fn select(&self, document: &Document) -> DatasetVariant {
        self.rules
            .iter()
            .find(|rule| rule.matches(document))
            .map_or(self.default, |rule| rule.variant)
    }

    pub fn rules(&self) -> &[DispatchRule] {
        &self.rules
    }

    pub fn default_variant(&self) -> DatasetVariant {
        self.default
    }
}
