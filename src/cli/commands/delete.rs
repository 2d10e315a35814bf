//! Delete command implementation
//!
//! This module implements the `delete` command, which propagates the
//! deletions listed in one export date's audit file.

use crate::cli::commands::{SyncContext, EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL};
use crate::config::load_config;
use crate::core::delete::DeletePropagator;
use crate::domain::ExportDate;
use clap::Args;

/// Arguments for the delete command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Export date whose audit file is processed (YYYYMMDD)
    #[arg(long)]
    pub date: ExportDate,

    /// Log deletes instead of performing them
    #[arg(long)]
    pub dry_run: bool,
}

impl DeleteArgs {
    /// Execute the delete command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(date = %self.date, "Starting delete command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                crate::log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - No records will be deleted");
            println!();
        }

        let context = match SyncContext::connect(&config).await {
            Ok(c) => c,
            Err(e) => {
                crate::log_error_with_context!(&e, "Failed to connect");
                eprintln!("Failed to initialize delete: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let propagator = DeletePropagator::new(
            &config,
            context.store,
            context.state_manager,
            context.service,
            context.cache,
            context.registry,
        );

        let summary = match propagator.run(self.date).await {
            Ok(s) => s,
            Err(e) => {
                crate::log_error_with_context!(&e, "Delete propagation failed");
                eprintln!("Delete failed: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        println!("📊 Delete Summary ({}):", summary.date);
        if summary.full_export {
            println!("  Full export date, no audit file to process");
        }
        println!("  Audit records: {}", summary.records_read);
        println!("  Skipped: {}", summary.records_skipped);
        println!("  Remote deleted: {}", summary.remote_deleted);
        println!("  Remote not found: {}", summary.remote_not_found);
        println!("  Remote skipped: {}", summary.remote_skipped);
        println!("  Documents deleted: {}", summary.local_deleted);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();
        println!("✅ Delete completed successfully!");

        Ok(0)
    }
}
