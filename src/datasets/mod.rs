//! Static dataset schema tables
//!
//! Each published dataset is described by a [`DatasetDefinition`] built from
//! a static table of column triples. The [`registry`] module ties the
//! variants together with the collection and delete-dispatch tables.

pub mod artefact;
pub mod column;
pub mod definition;
pub mod indexlot;
pub mod registry;
pub mod specimen;

pub use column::{ColumnTriple, TypeTag};
pub use definition::{
    DatasetDefinition, DatasetDefinitionBuilder, DatasetVariant, GeospatialFields, JoinSpec,
    PackageDescriptor, RecordTypeFilter, ResourceDescriptor, CATALOGUE_COLLECTION,
    DEFAULT_PRIMARY_KEY_PREFIX,
};
pub use registry::{
    CollectionRegistry, DeleteDispatch, DispatchRule, SchemaRegistry, RECORD_TYPE_FIELD,
};

/// `ColRecordType` of index lot records
pub const INDEX_LOT_RECORD_TYPE: &str = "Index Lot";

/// `ColRecordType` of artefact records
pub const ARTEFACT_RECORD_TYPE: &str = "Artefact";
