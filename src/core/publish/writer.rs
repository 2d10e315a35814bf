//! Batch writers
//!
//! Enriched batches are written either straight to the datastore through
//! `datastore_upsert` or appended to a CSV file for bulk loading with
//! `COPY`. Both targets only ever see output columns.

use crate::adapters::ckan::DatasetService;
use crate::config::{PublishConfig, WriteTarget};
use crate::core::extract::Batch;
use crate::datasets::DatasetDefinition;
use crate::domain::{ExportDate, ResourceId, Result, SyncError};
use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination of published rows
#[async_trait]
pub trait BatchWriter: Send {
    /// Write the output rows of a batch, returning the number written
    async fn write(&mut self, batch: &Batch) -> Result<usize>;

    /// Flush and report once every batch has been written
    async fn finish(&mut self) -> Result<()>;
}

/// Create the writer for the configured target
pub fn create_writer(
    config: &PublishConfig,
    service: Arc<dyn DatasetService>,
    definition: &DatasetDefinition,
    resource_id: ResourceId,
    date: Option<ExportDate>,
    dry_run: bool,
) -> Box<dyn BatchWriter> {
    match config.target {
        WriteTarget::Api => Box::new(ApiWriter::new(
            service,
            resource_id,
            config.write_batch_size,
            dry_run,
        )),
        WriteTarget::Csv => Box::new(CsvWriter::new(
            &config.csv_output_dir,
            definition,
            date,
            resource_id,
            dry_run,
        )),
    }
}

/// Writes rows with `datastore_upsert` in fixed-size chunks
pub struct ApiWriter {
    service: Arc<dyn DatasetService>,
    resource_id: ResourceId,
    chunk_size: usize,
    dry_run: bool,
    written: usize,
}

impl ApiWriter {
    pub fn new(
        service: Arc<dyn DatasetService>,
        resource_id: ResourceId,
        chunk_size: usize,
        dry_run: bool,
    ) -> Self {
        Self {
            service,
            resource_id,
            chunk_size: chunk_size.max(1),
            dry_run,
            written: 0,
        }
    }
}

#[async_trait]
impl BatchWriter for ApiWriter {
    async fn write(&mut self, batch: &Batch) -> Result<usize> {
        let records = batch.records();

        for chunk in records.chunks(self.chunk_size) {
            if self.dry_run {
                tracing::info!(
                    resource_id = %self.resource_id,
                    rows = chunk.len(),
                    "DRY RUN: Would upsert rows"
                );
                continue;
            }
            self.service
                .datastore_upsert(&self.resource_id, chunk.to_vec())
                .await?;
        }

        self.written += records.len();
        Ok(records.len())
    }

    async fn finish(&mut self) -> Result<()> {
        tracing::info!(
            resource_id = %self.resource_id,
            rows = self.written,
            "Finished writing to datastore"
        );
        Ok(())
    }
}

/// Appends rows to `<dir>/<variant>[-<date>].csv`
pub struct CsvWriter {
    path: PathBuf,
    resource_id: ResourceId,
    columns: Vec<String>,
    writer: Option<csv::Writer<File>>,
    dry_run: bool,
    written: usize,
}

impl CsvWriter {
    pub fn new(
        output_dir: &Path,
        definition: &DatasetDefinition,
        date: Option<ExportDate>,
        resource_id: ResourceId,
        dry_run: bool,
    ) -> Self {
        let mut file_name = definition.variant().as_str().to_string();
        if let Some(date) = date {
            file_name.push_str(&format!("-{date}"));
        }
        file_name.push_str(".csv");

        Self {
            path: output_dir.join(file_name),
            resource_id,
            columns: definition.output_field_names(),
            writer: None,
            dry_run,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `COPY` command loading the file into the datastore table
    pub fn copy_command(&self) -> String {
        format!(
            "COPY \"{}\" (\"{}\") FROM '{}' DELIMITER ',' CSV ENCODING 'UTF8';",
            self.resource_id,
            self.columns.join("\",\""),
            self.path.display()
        )
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<File>> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| {
                    SyncError::Io(format!("Failed to open {}: {e}", self.path.display()))
                })?;
            tracing::info!(path = %self.path.display(), "Writing CSV output");
            self.writer = Some(
                csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(file),
            );
        }
        self.writer
            .as_mut()
            .ok_or_else(|| SyncError::Io("CSV writer unavailable".to_string()))
    }
}

#[async_trait]
impl BatchWriter for CsvWriter {
    async fn write(&mut self, batch: &Batch) -> Result<usize> {
        if self.dry_run {
            tracing::info!(
                path = %self.path.display(),
                rows = batch.len(),
                "DRY RUN: Would append rows to CSV"
            );
            return Ok(batch.len());
        }

        let rows = batch.cells();
        let writer = self.writer()?;
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        self.written += rows.len();
        Ok(rows.len())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        tracing::info!(
            path = %self.path.display(),
            rows = self.written,
            "Import CSV file with: {}",
            self.copy_command()
        );
        Ok(())
    }
}
