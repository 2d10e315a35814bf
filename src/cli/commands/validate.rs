//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the catalogue-sync configuration file and the dataset definitions.

use crate::cli::commands::EXIT_CONFIG;
use crate::config::{load_config, StoreBackend};
use crate::datasets::SchemaRegistry;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(EXIT_CONFIG);
            }
        };

        let registry = match SchemaRegistry::standard() {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Dataset definitions are invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        match config.document_store.backend {
            StoreBackend::PostgreSQL => {
                println!("  Document Store: PostgreSQL");
                println!("  Max Connections: {}", config.document_store.max_connections);
                println!("  SSL Mode: {}", config.document_store.ssl_mode);
            }
            StoreBackend::Memory => println!("  Document Store: in-memory"),
        }
        println!("  CKAN Site: {}", config.ckan.site_url);
        println!("  API Key: {}", if config.ckan.api_key.is_some() { "set" } else { "not set" });
        println!("  Export Directory: {}", config.exports.directory.display());
        if let Some(date) = config.exports.full_export_date {
            println!("  Full Export Date: {date}");
        }
        println!("  Write Target: {:?}", config.publish.target);
        println!("  Write Batch Size: {}", config.publish.write_batch_size);
        println!();
        println!("Datasets:");
        for definition in registry.definitions() {
            println!(
                "  {} -> {} ({} output columns)",
                definition.variant(),
                definition.name(),
                definition.output_field_names().len()
            );
        }
        println!();

        Ok(0)
    }
}
