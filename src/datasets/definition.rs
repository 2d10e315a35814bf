//! Dataset definitions
//!
//! A [`DatasetDefinition`] describes one published dataset: which source
//! fields are extracted, how they are named and typed in the output, and how
//! the dataset is described to the remote dataset service. Definitions are
//! immutable once built; [`DatasetDefinitionBuilder::build`] enforces their
//! invariants.

use crate::datasets::column::ColumnTriple;
use crate::domain::{Result, SyncError};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Collection every dataset is extracted from
pub const CATALOGUE_COLLECTION: &str = "ecatalogue";

/// Namespace prepended to primary-key values before they are written
pub const DEFAULT_PRIMARY_KEY_PREFIX: &str = "NHMUK:ecatalogue:";

/// Closed set of dataset variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetVariant {
    Specimen,
    IndexLot,
    Artefact,
}

impl DatasetVariant {
    /// All variants, default first
    pub const ALL: [DatasetVariant; 3] = [
        DatasetVariant::Specimen,
        DatasetVariant::IndexLot,
        DatasetVariant::Artefact,
    ];

    /// Short name used on the command line and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetVariant::Specimen => "specimen",
            DatasetVariant::IndexLot => "indexlot",
            DatasetVariant::Artefact => "artefact",
        }
    }
}

impl fmt::Display for DatasetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetVariant {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "specimen" | "specimens" => Ok(DatasetVariant::Specimen),
            "indexlot" | "indexlots" => Ok(DatasetVariant::IndexLot),
            "artefact" | "artefacts" => Ok(DatasetVariant::Artefact),
            _ => Err(SyncError::Validation(format!(
                "Unknown dataset '{s}'. Expected one of: specimen, indexlot, artefact"
            ))),
        }
    }
}

/// Package metadata sent to `package_create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub title: String,
    pub notes: String,
    pub author: String,
    pub license_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_category: Option<String>,
}

/// Resource metadata sent to `datastore_create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub description: String,
    pub format: String,
}

/// Output fields holding coordinates, used to derive geometry columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeospatialFields {
    pub latitude_field: String,
    pub longitude_field: String,
}

/// How a variant restricts catalogue records by `ColRecordType`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordTypeFilter {
    /// Only records of exactly this type
    Equals(String),
    /// Every record whose type is not one of these
    Exclude(Vec<String>),
}

/// An auxiliary collection joined onto the batch through an integer key column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    /// Collection to look up
    pub collection: String,
    /// Destination name of the int32 column holding the joined `_id`
    pub key_column: String,
}

/// Immutable description of one dataset variant
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDefinition {
    variant: DatasetVariant,
    collection: String,
    package: PackageDescriptor,
    resource: ResourceDescriptor,
    primary_key: String,
    primary_key_prefix: Option<String>,
    record_type: Option<RecordTypeFilter>,
    geospatial: Option<GeospatialFields>,
    multimedia_field: Option<String>,
    joins: Vec<JoinSpec>,
    block_size: usize,
    columns: Vec<ColumnTriple>,
}

impl DatasetDefinition {
    /// Start building a definition for `variant`
    pub fn builder(variant: DatasetVariant) -> DatasetDefinitionBuilder {
        DatasetDefinitionBuilder::new(variant)
    }

    pub fn variant(&self) -> DatasetVariant {
        self.variant
    }

    /// Dataset name; the package name on the remote service
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Primary collection rows are extracted from
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn package(&self) -> &PackageDescriptor {
        &self.package
    }

    pub fn resource(&self) -> &ResourceDescriptor {
        &self.resource
    }

    /// Destination field holding the primary key
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn primary_key_prefix(&self) -> Option<&str> {
        self.primary_key_prefix.as_deref()
    }

    pub fn record_type(&self) -> Option<&RecordTypeFilter> {
        self.record_type.as_ref()
    }

    pub fn geospatial(&self) -> Option<&GeospatialFields> {
        self.geospatial.as_ref()
    }

    /// Output field holding `;`-delimited multimedia ids, if any
    pub fn multimedia_field(&self) -> Option<&str> {
        self.multimedia_field.as_deref()
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    /// Maximum number of rows per extracted batch
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// All column triples, in declaration order
    pub fn columns(&self) -> &[ColumnTriple] {
        &self.columns
    }

    /// The triple whose destination is the primary key
    pub fn primary_key_column(&self) -> &ColumnTriple {
        // Exactly one exists; enforced by the builder
        self.columns
            .iter()
            .find(|c| c.destination() == self.primary_key)
            .unwrap_or(&self.columns[0])
    }

    /// Triples sourced from `collection`, in declaration order
    pub fn collection_columns<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Iterator<Item = &'a ColumnTriple> + 'a {
        self.columns
            .iter()
            .filter(move |c| c.collection() == collection)
    }

    /// Triples that appear in the output, in declaration order
    pub fn output_columns(&self) -> impl Iterator<Item = &ColumnTriple> {
        self.columns.iter().filter(|c| c.is_output())
    }

    /// Output destination names, in declaration order
    pub fn output_field_names(&self) -> Vec<String> {
        self.output_columns()
            .map(|c| c.destination().to_string())
            .collect()
    }
}

/// Builder for [`DatasetDefinition`]
///
/// ```
/// use catalogue_sync::datasets::{DatasetDefinition, DatasetVariant};
///
/// let definition = DatasetDefinition::builder(DatasetVariant::Artefact)
///     .package("collection-artefacts", "Artefacts")
///     .resource("Artefacts", "Museum artefacts")
///     .primary_key("GUID")
///     .column("ecatalogue._id", "_id", "int32")
///     .column("ecatalogue.AdmGUIDPreferredValue", "GUID", "string:36")
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.output_field_names(), vec!["GUID"]);
/// ```
#[derive(Debug)]
pub struct DatasetDefinitionBuilder {
    variant: DatasetVariant,
    collection: String,
    package: PackageDescriptor,
    resource: ResourceDescriptor,
    primary_key: Option<String>,
    primary_key_prefix: Option<String>,
    record_type: Option<RecordTypeFilter>,
    geospatial: Option<GeospatialFields>,
    multimedia_field: Option<String>,
    joins: Vec<JoinSpec>,
    block_size: usize,
    columns: Vec<(String, String, String)>,
}

impl DatasetDefinitionBuilder {
    fn new(variant: DatasetVariant) -> Self {
        Self {
            variant,
            collection: CATALOGUE_COLLECTION.to_string(),
            package: PackageDescriptor {
                name: String::new(),
                title: String::new(),
                notes: String::new(),
                author: "Natural History Museum".to_string(),
                license_id: "other-open".to_string(),
                dataset_category: None,
            },
            resource: ResourceDescriptor {
                name: String::new(),
                description: String::new(),
                format: "dwc".to_string(),
            },
            primary_key: None,
            primary_key_prefix: Some(DEFAULT_PRIMARY_KEY_PREFIX.to_string()),
            record_type: None,
            geospatial: None,
            multimedia_field: None,
            joins: Vec::new(),
            block_size: 1000,
            columns: Vec::new(),
        }
    }

    pub fn package(mut self, name: impl Into<String>, title: impl Into<String>) -> Self {
        self.package.name = name.into();
        self.package.title = title.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.package.notes = notes.into();
        self
    }

    pub fn dataset_category(mut self, category: impl Into<String>) -> Self {
        self.package.dataset_category = Some(category.into());
        self
    }

    pub fn resource(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.resource.name = name.into();
        self.resource.description = description.into();
        self
    }

    pub fn resource_format(mut self, format: impl Into<String>) -> Self {
        self.resource.format = format.into();
        self
    }

    pub fn primary_key(mut self, destination: impl Into<String>) -> Self {
        self.primary_key = Some(destination.into());
        self
    }

    /// Override the primary-key namespace; `None` writes keys unprefixed
    pub fn primary_key_prefix(mut self, prefix: Option<&str>) -> Self {
        self.primary_key_prefix = prefix.map(str::to_string);
        self
    }

    pub fn record_type(mut self, filter: RecordTypeFilter) -> Self {
        self.record_type = Some(filter);
        self
    }

    pub fn geospatial(mut self, latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        self.geospatial = Some(GeospatialFields {
            latitude_field: latitude.into(),
            longitude_field: longitude.into(),
        });
        self
    }

    pub fn multimedia_field(mut self, field: impl Into<String>) -> Self {
        self.multimedia_field = Some(field.into());
        self
    }

    pub fn join(mut self, collection: impl Into<String>, key_column: impl Into<String>) -> Self {
        self.joins.push(JoinSpec {
            collection: collection.into(),
            key_column: key_column.into(),
        });
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn column(mut self, source: &str, destination: &str, type_tag: &str) -> Self {
        self.columns.push((
            source.to_string(),
            destination.to_string(),
            type_tag.to_string(),
        ));
        self
    }

    /// Validate and build the definition
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownTypeTag`] for an unknown column type and
    /// [`SyncError::Definition`] when:
    /// - the package or resource name is empty
    /// - the block size is zero
    /// - destinations are not unique
    /// - not exactly one column carries the primary key
    /// - a primary-key prefix is set on a non-string key column
    /// - geospatial, multimedia or join fields name no column
    pub fn build(self) -> Result<DatasetDefinition> {
        let variant = self.variant;
        let fail = |msg: String| SyncError::Definition(format!("{variant}: {msg}"));

        if self.package.name.trim().is_empty() {
            return Err(fail("package name cannot be empty".into()));
        }
        if self.resource.name.trim().is_empty() {
            return Err(fail("resource name cannot be empty".into()));
        }
        if self.block_size == 0 {
            return Err(fail("block size must be greater than 0".into()));
        }

        let columns = self
            .columns
            .iter()
            .map(|(s, d, t)| ColumnTriple::new(s, d, t))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.destination()) {
                return Err(fail(format!(
                    "duplicate destination field '{}'",
                    column.destination()
                )));
            }
        }

        let primary_key = self
            .primary_key
            .ok_or_else(|| fail("primary key is not set".into()))?;
        if !seen.contains(primary_key.as_str()) {
            return Err(fail(format!(
                "primary key '{primary_key}' does not match any column"
            )));
        }

        if self.primary_key_prefix.is_some() {
            let key_column = columns
                .iter()
                .find(|c| c.destination() == primary_key)
                .ok_or_else(|| fail(format!("primary key '{primary_key}' is not a column")))?;
            if !key_column.type_tag().is_text() {
                return Err(fail(format!(
                    "primary key '{primary_key}' must be a string column to carry a prefix"
                )));
            }
        }

        let has_column = |name: &str| seen.contains(name);
        if let Some(geo) = &self.geospatial {
            for field in [&geo.latitude_field, &geo.longitude_field] {
                if !has_column(field) {
                    return Err(fail(format!("geospatial field '{field}' is not a column")));
                }
            }
        }
        if let Some(field) = &self.multimedia_field {
            if !has_column(field) {
                return Err(fail(format!("multimedia field '{field}' is not a column")));
            }
        }
        for join in &self.joins {
            let key = columns
                .iter()
                .find(|c| c.destination() == join.key_column)
                .ok_or_else(|| fail(format!("join key '{}' is not a column", join.key_column)))?;
            if !key.type_tag().is_integer() {
                return Err(fail(format!(
                    "join key '{}' must be an integer column",
                    join.key_column
                )));
            }
        }

        Ok(DatasetDefinition {
            variant,
            collection: self.collection,
            package: self.package,
            resource: self.resource,
            primary_key,
            primary_key_prefix: self.primary_key_prefix,
            record_type: self.record_type,
            geospatial: self.geospatial,
            multimedia_field: self.multimedia_field,
            joins: self.joins,
            block_size: self.block_size,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DatasetDefinitionBuilder {
        DatasetDefinition::builder(DatasetVariant::Specimen)
            .package("collection-specimens", "Specimens")
            .resource("Specimens", "Specimen records")
            .primary_key("occurrenceID")
            .column("ecatalogue._id", "_id", "int32")
            .column("ecatalogue.AdmGUIDPreferredValue", "occurrenceID", "string:36")
            .column("ecatalogue.DarCatalogNumber", "catalogNumber", "string:100")
    }

    #[test]
    fn test_build_valid_definition() {
        let def = base().build().unwrap();
        assert_eq!(def.name(), "collection-specimens");
        assert_eq!(def.collection(), CATALOGUE_COLLECTION);
        assert_eq!(def.primary_key_column().field(), "AdmGUIDPreferredValue");
        assert_eq!(def.primary_key_prefix(), Some(DEFAULT_PRIMARY_KEY_PREFIX));
        assert_eq!(
            def.output_field_names(),
            vec!["occurrenceID".to_string(), "catalogNumber".to_string()]
        );
    }

    #[test]
    fn test_missing_primary_key_column() {
        let err = base().primary_key("guid").build().unwrap_err();
        assert!(err.to_string().contains("primary key 'guid'"));
    }

    #[test]
    fn test_prefixed_primary_key_must_be_text() {
        let err = base().primary_key("_id").build().unwrap_err();
        assert!(matches!(err, SyncError::Definition(_)));
        assert!(err.to_string().contains("must be a string column"));

        let unprefixed = base().primary_key("_id").primary_key_prefix(None).build().unwrap();
        assert_eq!(unprefixed.primary_key_column().field(), "_id");
    }

    #[test]
    fn test_duplicate_destination() {
        let err = base()
            .column("ecatalogue.Other", "catalogNumber", "string")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_unknown_type_tag_is_fatal() {
        let err = base()
            .column("ecatalogue.Weight", "weight", "decimal")
            .build()
            .unwrap_err();
        assert!(matches!(err, SyncError::UnknownTypeTag(_)));
    }

    #[test]
    fn test_zero_block_size() {
        assert!(base().block_size(0).build().is_err());
    }

    #[test]
    fn test_geospatial_fields_must_exist() {
        assert!(base()
            .geospatial("decimalLatitude", "decimalLongitude")
            .build()
            .is_err());
    }

    #[test]
    fn test_join_key_must_be_integer() {
        let err = base()
            .column("etaxonomy.ClaKingdom", "kingdom", "string:60")
            .join("etaxonomy", "catalogNumber")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn test_collection_columns() {
        let def = base()
            .column("ecatalogue.TaxonRef", "_taxonomy_irn", "int32")
            .column("etaxonomy.ClaKingdom", "kingdom", "string:60")
            .join("etaxonomy", "_taxonomy_irn")
            .build()
            .unwrap();
        let taxonomy: Vec<_> = def.collection_columns("etaxonomy").collect();
        assert_eq!(taxonomy.len(), 1);
        assert_eq!(def.collection_columns("ecatalogue").count(), 4);
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("index-lot".parse::<DatasetVariant>().unwrap(), DatasetVariant::IndexLot);
        assert_eq!("Artefact".parse::<DatasetVariant>().unwrap(), DatasetVariant::Artefact);
        assert!("plants".parse::<DatasetVariant>().is_err());
    }
}
