//! Status command implementation
//!
//! This module implements the `status` command, which lists export dates
//! found on disk next to the completion markers recorded for them.

use crate::adapters::database::create_stores;
use crate::adapters::exports::ExportCatalog;
use crate::cli::commands::{EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL};
use crate::config::load_config;
use crate::core::state::{StateManager, DELETE_TASK_ID};
use crate::domain::ExportDate;
use clap::Args;
use std::collections::{BTreeMap, BTreeSet};

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show markers of this task
    #[arg(long)]
    pub task_id: Option<String>,
}

/// One line of the status table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateStatus {
    pub date: ExportDate,
    pub has_export: bool,
    pub tasks: Vec<String>,
}

impl DateStatus {
    fn processed(&self) -> bool {
        self.tasks.iter().any(|t| t == DELETE_TASK_ID)
    }
}

/// Merge export dates on disk with recorded markers, ordered by date
pub fn date_statuses(
    export_dates: &BTreeSet<ExportDate>,
    markers: &[(String, ExportDate)],
    task_filter: Option<&str>,
) -> Vec<DateStatus> {
    let mut rows: BTreeMap<ExportDate, DateStatus> = export_dates
        .iter()
        .map(|date| {
            (
                *date,
                DateStatus {
                    date: *date,
                    has_export: true,
                    tasks: Vec::new(),
                },
            )
        })
        .collect();

    for (task_id, date) in markers {
        if task_filter.is_some_and(|filter| filter != task_id) {
            continue;
        }
        rows.entry(*date)
            .or_insert_with(|| DateStatus {
                date: *date,
                has_export: false,
                tasks: Vec::new(),
            })
            .tasks
            .push(task_id.clone());
    }

    rows.into_values().collect()
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking sync status");

        println!("📊 Sync Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (_, markers) = match create_stores(&config.document_store).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to document store");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };
        let state_manager = StateManager::new_with_storage(markers);

        let export_dates = match ExportCatalog::new(&config.exports.directory).export_dates() {
            Ok(d) => d,
            Err(e) => {
                println!("❌ Failed to scan export directory");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let markers = match state_manager.get_all_markers().await {
            Ok(m) => m,
            Err(e) => {
                println!("❌ Failed to load completion markers");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };
        let markers: Vec<(String, ExportDate)> =
            markers.into_iter().map(|m| (m.task_id, m.date)).collect();

        let rows = date_statuses(&export_dates, &markers, self.task_id.as_deref());
        if rows.is_empty() {
            println!("No export files or completion markers found.");
            println!("Export directory: {}", config.exports.directory.display());
            return Ok(0);
        }

        println!("{:<12} {:<8} {:<10} Tasks", "Date", "Export", "Processed");
        println!("{}", "-".repeat(60));
        for row in &rows {
            println!(
                "{:<12} {:<8} {:<10} {}",
                row.date.to_string(),
                if row.has_export { "yes" } else { "missing" },
                if row.processed() { "✅" } else { "⏸️" },
                row.tasks.join(", ")
            );
        }
        println!();

        if let Some(next) = rows.iter().find(|r| r.has_export && !r.processed()) {
            println!("Next export date to process: {}", next.date);
        } else {
            println!("All export dates processed.");
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: u32) -> ExportDate {
        ExportDate::new(value).unwrap()
    }

    #[test]
    fn test_date_statuses_merge_exports_and_markers() {
        let exports: BTreeSet<_> = [date(20140101), date(20140108)].into();
        let markers = vec![
            ("delete".to_string(), date(20140101)),
            ("delete".to_string(), date(20131225)),
        ];

        let rows = date_statuses(&exports, &markers, None);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, date(20131225));
        assert!(!rows[0].has_export);
        assert!(rows[1].processed());
        assert!(!rows[2].processed());
    }

    #[test]
    fn test_date_statuses_task_filter() {
        let exports: BTreeSet<_> = [date(20140101)].into();
        let markers = vec![("other".to_string(), date(20140101))];

        let rows = date_statuses(&exports, &markers, Some("delete"));
        assert!(rows[0].tasks.is_empty());
    }
}
