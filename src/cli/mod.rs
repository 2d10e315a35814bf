//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for catalogue-sync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// catalogue-sync - KE EMu catalogue publishing tool
#[derive(Parser, Debug)]
#[command(name = "catalogue-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "catalogue-sync.toml",
        env = "CATALOGUE_SYNC_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CATALOGUE_SYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish datasets from the document store to CKAN
    Publish(commands::publish::PublishArgs),

    /// Propagate the deletions of one export date
    Delete(commands::delete::DeleteArgs),

    /// Show export dates and completion markers
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::DatasetVariant;
    use crate::domain::ExportDate;

    #[test]
    fn test_cli_parse_publish() {
        let cli = Cli::parse_from(["catalogue-sync", "publish"]);
        assert_eq!(cli.config, "catalogue-sync.toml");
        assert!(matches!(cli.command, Commands::Publish(_)));
    }

    #[test]
    fn test_cli_parse_publish_datasets_and_date() {
        let cli = Cli::parse_from([
            "catalogue-sync",
            "publish",
            "--dataset",
            "indexlot,artefact",
            "--date",
            "20140522",
        ]);
        let Commands::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(
            args.dataset,
            vec![DatasetVariant::IndexLot, DatasetVariant::Artefact]
        );
        assert_eq!(args.date, Some(ExportDate::new(20140522).unwrap()));
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["catalogue-sync", "delete", "--date", "20141399"]).is_err());
    }

    #[test]
    fn test_cli_parse_delete() {
        let cli = Cli::parse_from(["catalogue-sync", "delete", "--date", "20140108", "--dry-run"]);
        let Commands::Delete(args) = cli.command else {
            panic!("expected delete");
        };
        assert!(args.dry_run);
    }

    #[test]
    fn test_cli_parse_with_config_and_log_level() {
        let cli = Cli::parse_from([
            "catalogue-sync",
            "--config",
            "custom.toml",
            "--log-level",
            "debug",
            "status",
        ]);
        assert_eq!(cli.config, "custom.toml");
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["catalogue-sync", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }
}
