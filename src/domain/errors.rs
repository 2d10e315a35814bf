//! Domain error types
//!
//! This module defines the error hierarchy for catalogue-sync. The top level
//! [`SyncError`] wraps the remote dataset service errors ([`CkanError`]) and
//! the document store errors ([`DocumentStoreError`]). Third-party error types
//! are converted to strings at the adapter boundary and never leak out.

use thiserror::Error;

/// Main catalogue-sync error type
///
/// Every fallible operation in the crate returns this error. Variants that map
/// to the fatal class of the error taxonomy abort the current run; callers
/// that want to treat a remote "not found" as success use [`SyncError::is_not_found`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote dataset service errors
    #[error("CKAN error: {0}")]
    Ckan(#[from] CkanError),

    /// Document store errors
    #[error("Document store error: {0}")]
    DocumentStore(#[from] DocumentStoreError),

    /// A dataset definition violates one of its construction invariants
    #[error("Dataset definition error: {0}")]
    Definition(String),

    /// A column declares a type tag the coercion layer does not know
    #[error("Unknown field type {0}")]
    UnknownTypeTag(String),

    /// The remote resource schema does not match the dataset output columns
    #[error(
        "Current datastore fields do not match output fields for resource {resource}: \
         expected {expected:?}, found {actual:?}"
    )]
    SchemaMismatch {
        resource: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Earlier export dates have not been processed yet
    #[error("Outstanding previous export file dates need to be processed first: {missing:?}")]
    DateOrdering { missing: Vec<u32> },

    /// A dataset has no resource on the remote service
    #[error("No datastore resource found for dataset {0}")]
    ResourceNotFound(String),

    /// A required export file is absent from the export directory
    #[error("Export files could not be found: {0}")]
    ExportFileNotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Completion marker errors
    #[error("State management error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Whether this error is a remote "not found" response
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Ckan(CkanError::NotFound(_)))
    }
}

/// CKAN-specific errors
///
/// Errors that occur when calling the action API of the remote dataset
/// service. [`CkanError::NotFound`] is kept separate from every other
/// failure because lookups and deletes treat it as a regular outcome.
#[derive(Debug, Error)]
pub enum CkanError {
    /// The requested package, resource or row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API key was rejected or lacks permission
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// The action rejected its parameters
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Failed to reach the service
    #[error("Failed to connect to CKAN: {0}")]
    ConnectionFailed(String),

    /// Response body did not follow the action API envelope
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Action reported `success: false` with an unrecognised error type
    #[error("Action {action} failed: {message}")]
    ActionFailed { action: String, message: String },

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },
}

/// Document store errors
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// Failed to connect to the store
    #[error("Failed to connect to document store: {0}")]
    ConnectionFailed(String),

    /// Schema setup failed
    #[error("Failed to initialise schema: {0}")]
    MigrationFailed(String),

    /// A read query failed
    #[error("Failed to query documents: {0}")]
    QueryFailed(String),

    /// An insert failed
    #[error("Failed to insert documents: {0}")]
    InsertFailed(String),

    /// A delete failed
    #[error("Failed to delete document: {0}")]
    DeleteFailed(String),

    /// A stored document could not be decoded
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// toml's message already carries its own "TOML parse error" location header
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(err.to_string())
    }
}

// Conversion from csv writer errors
impl From<csv::Error> for SyncError {
    fn from(err: csv::Error) -> Self {
        SyncError::Io(format!("CSV error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_ckan_error_conversion() {
        let ckan_err = CkanError::ConnectionFailed("Network error".to_string());
        let err: SyncError = ckan_err.into();
        assert!(matches!(err, SyncError::Ckan(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_detection() {
        let err: SyncError = CkanError::NotFound("package specimen".to_string()).into();
        assert!(err.is_not_found());

        let err = SyncError::DocumentStore(DocumentStoreError::QueryFailed("boom".into()));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_date_ordering_message_names_missing_dates() {
        let err = SyncError::DateOrdering {
            missing: vec![20140605],
        };
        assert!(err.to_string().contains("20140605"));
    }

    #[test]
    fn test_unknown_type_tag_message() {
        let err = SyncError::UnknownTypeTag("decimal".to_string());
        assert_eq!(err.to_string(), "Unknown field type decimal");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: SyncError = io_err.into();
        assert!(matches!(err, SyncError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: SyncError = json_err.into();
        assert!(matches!(err, SyncError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: SyncError = toml_err.into();
        assert!(matches!(err, SyncError::Configuration(_)));
        let message = err.to_string();
        assert!(message.starts_with("Configuration error: TOML parse error at line 1"));
        assert_eq!(message.matches("TOML parse error").count(), 1);
    }
}
