//! CKAN action API models
//!
//! Request and response bodies for the subset of the action API used to
//! publish datasets, plus the `{success, result, error}` envelope every
//! action response is wrapped in.

use crate::datasets::{GeospatialFields, PackageDescriptor, ResourceDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rows sent to or stored in the datastore
pub type Record = Map<String, Value>;

/// Response envelope shared by every action
#[derive(Debug, Deserialize)]
pub struct ActionEnvelope {
    pub success: bool,

    #[serde(default)]
    pub result: Option<Value>,

    #[serde(default)]
    pub error: Option<ActionError>,
}

/// `error` member of a failed action
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionError {
    /// CKAN error class, e.g. `Not Found Error`
    #[serde(rename = "__type", default)]
    pub error_type: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    /// Field-level validation messages
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ActionError {
    /// Human-readable summary of the error
    pub fn describe(&self) -> String {
        match (&self.message, self.details.is_empty()) {
            (Some(message), _) => message.clone(),
            (None, false) => Value::Object(self.details.clone()).to_string(),
            (None, true) => self
                .error_type
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

/// A dataset package with its resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// A resource inside a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub package_id: Option<String>,
}

/// One datastore column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl FieldSpec {
    pub fn new(id: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_type: field_type.into(),
        }
    }
}

/// Resource part of a `datastore_create` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewResource {
    pub package_id: String,
    pub name: String,
    pub description: String,
    pub format: String,
}

impl NewResource {
    pub fn from_descriptor(package_id: impl Into<String>, resource: &ResourceDescriptor) -> Self {
        Self {
            package_id: package_id.into(),
            name: resource.name.clone(),
            description: resource.description.clone(),
            format: resource.format.clone(),
        }
    }
}

/// `datastore_create` request creating a resource and its table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatastoreCreate {
    pub resource: NewResource,
    pub fields: Vec<FieldSpec>,
    pub primary_key: String,
}

/// `datastore_create` response
#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreCreated {
    pub resource_id: String,
}

/// `datastore_search` response, read with `limit = 0` for the schema only
#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreSearch {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// `package_create` request
#[derive(Debug, Clone, Serialize)]
pub struct PackageCreate<'a> {
    #[serde(flatten)]
    pub package: &'a PackageDescriptor,
    pub resources: Vec<Value>,
}

/// `create_geom_columns` request
#[derive(Debug, Clone, Serialize)]
pub struct GeomColumns<'a> {
    pub resource_id: &'a str,
    pub lat_field: &'a str,
    pub long_field: &'a str,
    pub populate: bool,
}

impl<'a> GeomColumns<'a> {
    pub fn new(resource_id: &'a str, fields: &'a GeospatialFields) -> Self {
        Self {
            resource_id,
            lat_field: &fields.latitude_field,
            long_field: &fields.longitude_field,
            populate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success_envelope() {
        let env: ActionEnvelope = serde_json::from_value(json!({
            "help": "...",
            "success": true,
            "result": {"id": "p1", "name": "collection-specimens", "resources": [{"id": "r1", "name": "Specimens"}]}
        }))
        .unwrap();
        assert!(env.success);
        let package: Package = serde_json::from_value(env.result.unwrap()).unwrap();
        assert_eq!(package.resources[0].id, "r1");
    }

    #[test]
    fn test_parse_error_envelope() {
        let env: ActionEnvelope = serde_json::from_value(json!({
            "success": false,
            "error": {"__type": "Not Found Error", "message": "Not found"}
        }))
        .unwrap();
        let error = env.error.unwrap();
        assert_eq!(error.error_type.as_deref(), Some("Not Found Error"));
        assert_eq!(error.describe(), "Not found");
    }

    #[test]
    fn test_validation_error_details() {
        let error: ActionError = serde_json::from_value(json!({
            "__type": "Validation Error",
            "name": ["That URL is already in use."]
        }))
        .unwrap();
        assert!(error.describe().contains("already in use"));
    }

    #[test]
    fn test_field_spec_serializes_type() {
        let value = serde_json::to_value(FieldSpec::new("year", "integer")).unwrap();
        assert_eq!(value, json!({"id": "year", "type": "integer"}));
    }
}
