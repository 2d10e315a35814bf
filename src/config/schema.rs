//! Configuration schema types
//!
//! Every section maps to a TOML table and validates itself with a
//! `validate()` returning a human-readable message; [`SyncConfig::validate`]
//! runs them all.

use crate::config::SecretString;
use crate::domain::ExportDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL with JSONB documents
    PostgreSQL,
    /// Process memory; nothing survives the run
    Memory,
}

/// Where published batches are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteTarget {
    /// Upsert through the CKAN datastore API
    #[default]
    Api,
    /// Append to a CSV file for bulk `COPY`
    Csv,
}

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Root configuration, mapping to the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Document store holding the ingested exports
    pub document_store: DocumentStoreConfig,

    /// Remote dataset service
    pub ckan: CkanConfig,

    /// KE EMu export files
    pub exports: ExportsConfig,

    /// Publishing settings
    #[serde(default)]
    pub publish: PublishConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.document_store.validate()?;
        self.ckan.validate(&self.environment)?;
        self.exports.validate()?;
        self.publish.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log remote writes and deletes instead of performing them
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    /// Backend (postgresql or memory)
    pub backend: StoreBackend,

    /// PostgreSQL connection string; required for the postgresql backend
    #[serde(default)]
    pub connection_string: Option<SecretString>,

    /// Maximum pooled connections
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: usize,

    /// Pool wait/create timeout in seconds
    #[serde(default = "default_pg_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,

    /// Per-statement timeout in seconds
    #[serde(default = "default_pg_statement_timeout_seconds")]
    pub statement_timeout_seconds: u64,

    /// SSL mode (disable, prefer, require, verify-ca, verify-full)
    #[serde(default = "default_pg_ssl_mode")]
    pub ssl_mode: String,
}

impl DocumentStoreConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.backend == StoreBackend::PostgreSQL {
            let conn_str = self
                .connection_string
                .as_ref()
                .map(|s| s.expose_secret())
                .ok_or_else(|| {
                    "document_store.connection_string is required when backend = 'postgresql'"
                        .to_string()
                })?;

            if conn_str.is_empty() {
                return Err("document_store.connection_string cannot be empty".to_string());
            }

            if !conn_str.starts_with("postgresql://") && !conn_str.starts_with("postgres://") {
                return Err(
                    "document_store.connection_string must start with postgresql:// or postgres://"
                        .to_string(),
                );
            }
        }

        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(format!(
                "document_store.max_connections must be between 1 and 100, got {}",
                self.max_connections
            ));
        }

        let valid_ssl_modes = ["disable", "prefer", "require", "verify-ca", "verify-full"];
        if !valid_ssl_modes.contains(&self.ssl_mode.as_str()) {
            return Err(format!(
                "document_store.ssl_mode must be one of: {}, got '{}'",
                valid_ssl_modes.join(", "),
                self.ssl_mode
            ));
        }

        Ok(())
    }
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            connection_string: None,
            max_connections: default_pg_max_connections(),
            connection_timeout_seconds: default_pg_connection_timeout_seconds(),
            statement_timeout_seconds: default_pg_statement_timeout_seconds(),
            ssl_mode: default_pg_ssl_mode(),
        }
    }
}

/// CKAN action API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CkanConfig {
    /// Site root, e.g. `https://data.nhm.ac.uk`
    pub site_url: String,

    /// API key sent in the `Authorization` header
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

impl CkanConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        let url = url::Url::parse(&self.site_url)
            .map_err(|e| format!("ckan.site_url '{}' is not a valid URL: {e}", self.site_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err("ckan.site_url must start with http:// or https://".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("ckan.timeout_seconds must be > 0".to_string());
        }

        if *environment == Environment::Production {
            if !self.tls_verify {
                return Err(
                    "TLS certificate verification cannot be disabled in production environments"
                        .to_string(),
                );
            }
            if self
                .api_key
                .as_ref()
                .map_or(true, |k| k.expose_secret().is_empty())
            {
                return Err("ckan.api_key is required in production environments".to_string());
            }
        }

        Ok(())
    }
}

impl Default for CkanConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:5000".to_string(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
            tls_verify: true,
        }
    }
}

/// Export file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportsConfig {
    /// Directory holding `module.extension.date[.gz]` export files
    pub directory: PathBuf,

    /// Date of the full export; it carries no `eaudit` file
    #[serde(default)]
    pub full_export_date: Option<ExportDate>,
}

impl ExportsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.directory.as_os_str().is_empty() {
            return Err("exports.directory cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/var/lib/keemu/exports"),
            full_export_date: None,
        }
    }
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Write target (api or csv)
    #[serde(default)]
    pub target: WriteTarget,

    /// Rows per datastore upsert request
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,

    /// Directory CSV files are written to
    #[serde(default = "default_csv_output_dir")]
    pub csv_output_dir: PathBuf,

    /// `SecRecordStatus` value selected for publishing
    #[serde(default = "default_record_status")]
    pub record_status: String,

    /// `MulMimeFormat` values the image service can deliver
    #[serde(default = "default_multimedia_formats")]
    pub multimedia_formats: Vec<String>,

    /// Image URL template with `{irn}`, `{width}` and `{height}` placeholders
    #[serde(default = "default_multimedia_url_template")]
    pub multimedia_url_template: String,
}

impl PublishConfig {
    fn validate(&self) -> Result<(), String> {
        if self.write_batch_size == 0 || self.write_batch_size > 5000 {
            return Err(format!(
                "publish.write_batch_size must be between 1 and 5000, got {}",
                self.write_batch_size
            ));
        }

        if self.record_status.trim().is_empty() {
            return Err("publish.record_status cannot be empty".to_string());
        }

        if self.multimedia_formats.is_empty() {
            return Err("publish.multimedia_formats cannot be empty".to_string());
        }

        if !self.multimedia_url_template.contains("{irn}") {
            return Err("publish.multimedia_url_template must contain {irn}".to_string());
        }

        Ok(())
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            target: WriteTarget::default(),
            write_batch_size: default_write_batch_size(),
            csv_output_dir: default_csv_output_dir(),
            record_status: default_record_status(),
            multimedia_formats: default_multimedia_formats(),
            multimedia_url_template: default_multimedia_url_template(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to files
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rotation policy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".into());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_pg_max_connections() -> usize {
    10
}

fn default_pg_connection_timeout_seconds() -> u64 {
    30
}

fn default_pg_statement_timeout_seconds() -> u64 {
    300
}

fn default_pg_ssl_mode() -> String {
    "prefer".to_string()
}

fn default_write_batch_size() -> usize {
    200
}

fn default_csv_output_dir() -> PathBuf {
    PathBuf::from("/var/lib/catalogue-sync/csv")
}

fn default_record_status() -> String {
    "Active".to_string()
}

fn default_multimedia_formats() -> Vec<String> {
    vec!["jpeg".to_string(), "jp2".to_string()]
}

fn default_multimedia_url_template() -> String {
    "http://www.nhm.ac.uk/emu-classes/class.EMuMedia.php?irn={irn}&image=yes&width={width}&height={height}"
        .to_string()
}

fn default_local_path() -> String {
    "/var/log/catalogue-sync".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
