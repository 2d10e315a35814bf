//! Specimen dataset
//!
//! The default variant: every active catalogue record that is neither an
//! index lot nor an artefact.

use crate::datasets::definition::{DatasetDefinition, DatasetVariant, RecordTypeFilter};
use crate::datasets::{ARTEFACT_RECORD_TYPE, INDEX_LOT_RECORD_TYPE};
use crate::domain::Result;

/// Build the specimen definition
pub fn definition() -> Result<DatasetDefinition> {
    DatasetDefinition::builder(DatasetVariant::Specimen)
        .package("collection-specimens", "Collection specimens")
        .notes("Specimen records from the Natural History Museum's collection")
        .dataset_category("Collections")
        .resource("Specimens", "Specimen records")
        .primary_key("occurrenceID")
        .record_type(RecordTypeFilter::Exclude(vec![
            INDEX_LOT_RECORD_TYPE.to_string(),
            ARTEFACT_RECORD_TYPE.to_string(),
        ]))
        .geospatial("decimalLatitude", "decimalLongitude")
        .multimedia_field("associatedMedia")
        .block_size(1000)
        .column("ecatalogue._id", "_id", "int32")
        .column("ecatalogue.AdmGUIDPreferredValue", "occurrenceID", "string:36")
        .column("ecatalogue.DarCatalogNumber", "catalogNumber", "string:100")
        .column("ecatalogue.DarScientificName", "scientificName", "string:100")
        .column("ecatalogue.DarScientificNameAuthor", "scientificNameAuthorship", "string:100")
        .column("ecatalogue.DarKingdom", "kingdom", "string:60")
        .column("ecatalogue.DarFamily", "family", "string:100")
        .column("ecatalogue.DarGenus", "genus", "string:100")
        .column("ecatalogue.DarCollectionCode", "collectionCode", "string:100")
        .column("ecatalogue.DarBasisOfRecord", "basisOfRecord", "string:50")
        .column("ecatalogue.ColRecordType", "recordType", "string:100")
        .column("ecatalogue.DarCountry", "country", "string:100")
        .column("ecatalogue.DarStateProvince", "stateProvince", "string:100")
        .column("ecatalogue.DarLocality", "locality", "string")
        .column("ecatalogue.DarDecimalLatitude", "decimalLatitude", "float64")
        .column("ecatalogue.DarDecimalLongitude", "decimalLongitude", "float64")
        .column("ecatalogue.DarCollector", "recordedBy", "string:100")
        .column("ecatalogue.DarYearCollected", "year", "int32")
        .column("ecatalogue.DarMonthCollected", "month", "int32")
        .column("ecatalogue.DarDayCollected", "day", "int32")
        .column("ecatalogue.DarIndividualCount", "individualCount", "int32")
        .column("ecatalogue.DarTypeStatus", "typeStatus", "string:100")
        .column("ecatalogue.MulMultiMediaRef", "associatedMedia", "string")
        .build()
}
