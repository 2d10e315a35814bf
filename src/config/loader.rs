//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{StoreBackend, SyncConfig, WriteTarget};
use super::secret::secret_string;
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use crate::domain::ExportDate;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`SyncConfig`]
/// 4. Applies environment variable overrides (`CATALOGUE_SYNC_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - A referenced environment variable is not set
/// - TOML parsing fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use catalogue_sync::config::loader::load_config;
///
/// let config = load_config("catalogue-sync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration from TOML text
///
/// # Errors
///
/// Same as [`load_config`], minus file access.
pub fn parse_config(contents: &str) -> Result<SyncConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: SyncConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SyncError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            })
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env(key: &str) -> Option<String> {
    std::env::var(format!("CATALOGUE_SYNC_{key}")).ok()
}

/// Applies environment variable overrides using the `CATALOGUE_SYNC_` prefix
///
/// Variables follow the pattern `CATALOGUE_SYNC_<SECTION>_<KEY>`, for example
/// `CATALOGUE_SYNC_CKAN_API_KEY` or `CATALOGUE_SYNC_PUBLISH_TARGET`.
fn apply_env_overrides(config: &mut SyncConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env("APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Document store overrides
    if let Some(val) = env("DOCUMENT_STORE_BACKEND") {
        config.document_store.backend = match val.to_lowercase().as_str() {
            "postgresql" => StoreBackend::PostgreSQL,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(SyncError::Configuration(format!(
                    "Invalid CATALOGUE_SYNC_DOCUMENT_STORE_BACKEND '{other}'"
                )))
            }
        };
    }
    if let Some(val) = env("DOCUMENT_STORE_CONNECTION_STRING") {
        config.document_store.connection_string = Some(secret_string(val));
    }
    if let Some(size) = env("DOCUMENT_STORE_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
        config.document_store.max_connections = size;
    }
    if let Some(val) = env("DOCUMENT_STORE_SSL_MODE") {
        config.document_store.ssl_mode = val;
    }

    // CKAN overrides
    if let Some(val) = env("CKAN_SITE_URL") {
        config.ckan.site_url = val;
    }
    if let Some(val) = env("CKAN_API_KEY") {
        config.ckan.api_key = Some(secret_string(val));
    }
    if let Some(val) = env("CKAN_TLS_VERIFY") {
        config.ckan.tls_verify = val.parse().unwrap_or(true);
    }

    // Export overrides
    if let Some(val) = env("EXPORTS_DIRECTORY") {
        config.exports.directory = val.into();
    }
    if let Some(val) = env("EXPORTS_FULL_EXPORT_DATE") {
        let date: ExportDate = val.parse().map_err(SyncError::Configuration)?;
        config.exports.full_export_date = Some(date);
    }

    // Publish overrides
    if let Some(val) = env("PUBLISH_TARGET") {
        config.publish.target = match val.to_lowercase().as_str() {
            "api" => WriteTarget::Api,
            "csv" => WriteTarget::Csv,
            other => {
                return Err(SyncError::Configuration(format!(
                    "Invalid CATALOGUE_SYNC_PUBLISH_TARGET '{other}'"
                )))
            }
        };
    }
    if let Some(size) = env("PUBLISH_WRITE_BATCH_SIZE").and_then(|v| v.parse().ok()) {
        config.publish.write_batch_size = size;
    }
    if let Some(val) = env("PUBLISH_CSV_OUTPUT_DIR") {
        config.publish.csv_output_dir = val.into();
    }

    // Logging overrides
    if let Some(val) = env("LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Some(val) = env("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[document_store]
backend = "memory"

[ckan]
site_url = "https://data.example.org"

[exports]
directory = "/data/exports"
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("CS_TEST_SUBST_VAR", "test_value");
        let result = substitute_env_vars("api_key = \"${CS_TEST_SUBST_VAR}\"").unwrap();
        assert_eq!(result, "api_key = \"test_value\"\n");
        std::env::remove_var("CS_TEST_SUBST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("CS_TEST_MISSING_VAR");
        let err = substitute_env_vars("api_key = \"${CS_TEST_MISSING_VAR}\"").unwrap_err();
        assert!(err.to_string().contains("CS_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("CS_TEST_COMMENTED");
        let result = substitute_env_vars("# api_key = \"${CS_TEST_COMMENTED}\"").unwrap();
        assert!(result.contains("${CS_TEST_COMMENTED}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("nonexistent.toml").is_err());
    }

    #[test]
    fn test_load_config_minimal() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.ckan.site_url, "https://data.example.org");
        assert_eq!(config.document_store.backend, StoreBackend::Memory);
        assert_eq!(config.publish.write_batch_size, 200);
        assert!(config.exports.full_export_date.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
environment = "staging"

[application]
log_level = "debug"
dry_run = true

[document_store]
backend = "postgresql"
connection_string = "postgresql://sync:pw@localhost:5432/keemu"
ssl_mode = "disable"

[ckan]
site_url = "https://data.example.org"
api_key = "abc"

[exports]
directory = "/data/exports"
full_export_date = 20140522

[publish]
target = "csv"
write_batch_size = 500
csv_output_dir = "/tmp/csv"
"#;
        let config = parse_config(toml).unwrap();
        assert!(config.application.dry_run);
        assert_eq!(config.publish.target, WriteTarget::Csv);
        assert_eq!(config.publish.write_batch_size, 500);
        assert_eq!(
            config.exports.full_export_date,
            Some(ExportDate::new(20140522).unwrap())
        );
        assert_eq!(
            config.ckan.api_key.unwrap().expose_secret().as_ref(),
            "abc"
        );
    }

    #[test]
    fn test_invalid_full_export_date() {
        let toml = MINIMAL.replace(
            "directory = \"/data/exports\"",
            "directory = \"/data/exports\"\nfull_export_date = 20141340",
        );
        assert!(parse_config(&toml).is_err());
    }
}
