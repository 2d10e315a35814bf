//! Configuration management for catalogue-sync.
//!
//! # Overview
//!
//! catalogue-sync uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CATALOGUE_SYNC_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level and dry-run mode
//! - [`DocumentStoreConfig`] - backend and PostgreSQL connection
//! - [`CkanConfig`] - remote dataset service site and API key
//! - [`ExportsConfig`] - export directory and full export date
//! - [`PublishConfig`] - write target, write batch size, multimedia settings
//! - [`LoggingConfig`] - JSON file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [document_store]
//! backend = "postgresql"
//! connection_string = "${KEEMU_DATABASE_URL}"
//!
//! [ckan]
//! site_url = "https://data.nhm.ac.uk"
//! api_key = "${CKAN_API_KEY}"
//!
//! [exports]
//! directory = "/data/keemu/exports"
//! full_export_date = 20140522
//!
//! [publish]
//! target = "api"
//! write_batch_size = 200
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CkanConfig, DocumentStoreConfig, Environment, ExportsConfig,
    LoggingConfig, PublishConfig, StoreBackend, SyncConfig, WriteTarget,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
