//! Publish command implementation
//!
//! This module implements the `publish` command, which pushes one or more
//! datasets from the document store to the remote service.

use crate::cli::commands::{
    SyncContext, EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL, EXIT_INTERRUPTED,
};
use crate::config::{load_config, WriteTarget};
use crate::core::publish::{PublishCoordinator, PublishSummary};
use crate::datasets::DatasetVariant;
use crate::domain::ExportDate;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the publish command
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Datasets to publish (comma-separated: specimen, indexlot, artefact); all when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub dataset: Vec<DatasetVariant>,

    /// Only publish records ingested from this export date (YYYYMMDD)
    #[arg(long)]
    pub date: Option<ExportDate>,

    /// Write target, overriding `publish.target`
    #[arg(long, value_parser = parse_target)]
    pub target: Option<WriteTarget>,

    /// Directory for CSV output, overriding `publish.csv_output_dir`
    #[arg(long)]
    pub csv_output_dir: Option<PathBuf>,

    /// Log remote writes instead of performing them
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_target(value: &str) -> Result<WriteTarget, String> {
    match value.to_lowercase().as_str() {
        "api" => Ok(WriteTarget::Api),
        "csv" => Ok(WriteTarget::Csv),
        other => Err(format!("Unknown target '{other}'. Expected api or csv")),
    }
}

impl PublishArgs {
    /// Datasets selected on the command line, all of them by default
    pub fn variants(&self) -> Vec<DatasetVariant> {
        if self.dataset.is_empty() {
            DatasetVariant::ALL.to_vec()
        } else {
            self.dataset.clone()
        }
    }

    /// Execute the publish command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting publish command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                crate::log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        if let Some(target) = self.target {
            tracing::info!(target = ?target, "Overriding write target from CLI");
            config.publish.target = target;
        }
        if let Some(dir) = &self.csv_output_dir {
            config.publish.csv_output_dir = dir.clone();
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - No data will be written to the remote service");
            println!();
        }

        let context = match SyncContext::connect(&config).await {
            Ok(c) => c,
            Err(e) => {
                crate::log_error_with_context!(&e, "Failed to connect");
                eprintln!("Failed to initialize publish: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let coordinator = PublishCoordinator::new(
            config,
            context.store,
            context.state_manager,
            context.service,
            context.cache,
            context.registry,
        )
        .with_shutdown_signal(shutdown_signal);

        println!("🚀 Starting publish...");
        println!();

        let summaries = match coordinator.publish_all(&self.variants(), self.date).await {
            Ok(s) => s,
            Err(e) => {
                crate::log_error_with_context!(&e, "Publish failed");
                eprintln!("Publish failed: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        println!("📊 Publish Summary:");
        for summary in &summaries {
            print_summary(summary);
        }
        println!();

        if summaries.iter().any(|s| s.interrupted) {
            println!("⚠️  Publish interrupted after the current batch.");
            println!("   Rerun the same command to publish again.");
            tracing::info!("Publish interrupted by user signal");
            return Ok(EXIT_INTERRUPTED);
        }

        println!("✅ Publish completed successfully!");
        Ok(0)
    }
}

fn print_summary(summary: &PublishSummary) {
    println!(
        "  {}: {} rows in {} batches to {} ({:.2}s)",
        summary.variant,
        summary.rows_written,
        summary.batches,
        summary
            .resource_id
            .as_ref()
            .map_or("-", |id| id.as_str()),
        summary.duration.as_secs_f64()
    );
    if summary.rows_skipped > 0 {
        println!(
            "    ⚠️  {} records skipped without a primary key value",
            summary.rows_skipped
        );
    }
}
