//! Index lot dataset
//!
//! Index lots are catalogue records summarising the material held for a
//! taxon. Taxonomic names come from `etaxonomy`, joined on the record's
//! taxon reference.

use crate::datasets::definition::{DatasetDefinition, DatasetVariant, RecordTypeFilter};
use crate::datasets::INDEX_LOT_RECORD_TYPE;
use crate::domain::Result;

/// Build the index lot definition
pub fn definition() -> Result<DatasetDefinition> {
    DatasetDefinition::builder(DatasetVariant::IndexLot)
        .package("collection-indexlots", "Index lots")
        .notes("Index lot records from the Natural History Museum's collection")
        .dataset_category("Collections")
        .resource("Index lots", "Material held per taxon")
        .primary_key("GUID")
        .record_type(RecordTypeFilter::Equals(INDEX_LOT_RECORD_TYPE.to_string()))
        .multimedia_field("multimedia")
        .join("etaxonomy", "_taxonomy_irn")
        .block_size(1000)
        .column("ecatalogue._id", "_id", "int32")
        .column("ecatalogue.AdmGUIDPreferredValue", "GUID", "string:36")
        .column("ecatalogue.EntIndMaterial", "material", "bool")
        .column("ecatalogue.EntIndType", "type", "bool")
        .column("ecatalogue.EntIndMedia", "media", "bool")
        .column("ecatalogue.EntIndBritish", "british", "bool")
        .column("ecatalogue.EntIndKindOfMaterial", "kindOfMaterial", "string:100")
        .column("ecatalogue.EntIndKindOfMedia", "kindOfMedia", "string:100")
        .column("ecatalogue.EntIndMaterialCount", "materialCount", "int32")
        .column("ecatalogue.EntIndIndexLotTaxonNameLocalRef", "_taxonomy_irn", "int32")
        .column("ecatalogue.MulMultiMediaRef", "multimedia", "string")
        .column("etaxonomy.ClaScientificNameBuilt", "scientificName", "string:100")
        .column("etaxonomy.ClaCurrentSciNameLocal", "currentScientificName", "string:100")
        .column("etaxonomy.ClaKingdom", "kingdom", "string:60")
        .column("etaxonomy.ClaPhylum", "phylum", "string:100")
        .column("etaxonomy.ClaClass", "class", "string:100")
        .column("etaxonomy.ClaOrder", "order", "string:100")
        .column("etaxonomy.ClaFamily", "family", "string:100")
        .column("etaxonomy.ClaGenus", "genus", "string:100")
        .column("etaxonomy.ClaRank", "taxonRank", "string:20")
        .build()
}
