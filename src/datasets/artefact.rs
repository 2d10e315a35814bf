//! Artefact dataset

use crate::datasets::definition::{DatasetDefinition, DatasetVariant, RecordTypeFilter};
use crate::datasets::ARTEFACT_RECORD_TYPE;
use crate::domain::Result;

/// Build the artefact definition
pub fn definition() -> Result<DatasetDefinition> {
    DatasetDefinition::builder(DatasetVariant::Artefact)
        .package("collection-artefacts", "Artefacts")
        .notes("Cultural and historical artefacts held by the Natural History Museum")
        .dataset_category("Collections")
        .resource("Artefacts", "Museum artefacts")
        .primary_key("GUID")
        .record_type(RecordTypeFilter::Equals(ARTEFACT_RECORD_TYPE.to_string()))
        .multimedia_field("multimedia")
        .block_size(1000)
        .column("ecatalogue._id", "_id", "int32")
        .column("ecatalogue.AdmGUIDPreferredValue", "GUID", "string:36")
        .column("ecatalogue.ArtName", "artefactName", "string:100")
        .column("ecatalogue.ArtKind", "artefactType", "string:100")
        .column("ecatalogue.PalArtDescription", "artefactDescription", "string")
        .column("ecatalogue.IdeCurrentScientificName", "scientificName", "string:100")
        .column("ecatalogue.MulMultiMediaRef", "multimedia", "string")
        .build()
}
