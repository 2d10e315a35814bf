//! Export directory scanning

use crate::domain::{ExportDate, Result, SyncError};
use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const GZIP_SUFFIX: &str = ".gz";

/// The dated export files of one export directory
#[derive(Debug, Clone)]
pub struct ExportCatalog {
    directory: PathBuf,
}

/// A located export file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub path: PathBuf,
    pub compressed: bool,
}

impl ExportFile {
    /// Open the file for line reading, decompressing `.gz` files
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        let file = File::open(&self.path).map_err(|e| {
            SyncError::Io(format!("Failed to open {}: {e}", self.path.display()))
        })?;

        if self.compressed {
            Ok(Box::new(BufReader::new(GzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

impl ExportCatalog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Every export date present in the directory
    ///
    /// Names that do not follow `module.extension.YYYYMMDD[.gz]` are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn export_dates(&self) -> Result<BTreeSet<ExportDate>> {
        let entries = fs::read_dir(&self.directory).map_err(|e| {
            SyncError::Io(format!(
                "Failed to read export directory {}: {e}",
                self.directory.display()
            ))
        })?;

        let mut dates = BTreeSet::new();
        for entry in entries {
            let entry = entry?;
            if let Some(date) = entry.file_name().to_str().and_then(parse_export_date) {
                dates.insert(date);
            }
        }

        tracing::debug!(
            directory = %self.directory.display(),
            count = dates.len(),
            "Scanned export file dates"
        );
        Ok(dates)
    }

    /// Locate the export file of `module` for `date`
    ///
    /// The plain file is preferred over its `.gz` counterpart.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ExportFileNotFound`] naming both tried paths if
    /// neither exists.
    pub fn locate(&self, module: &str, extension: &str, date: ExportDate) -> Result<ExportFile> {
        let plain = self.directory.join(format!("{module}.{extension}.{date}"));
        if plain.is_file() {
            return Ok(ExportFile {
                path: plain,
                compressed: false,
            });
        }

        let compressed = self
            .directory
            .join(format!("{module}.{extension}.{date}{GZIP_SUFFIX}"));
        if compressed.is_file() {
            return Ok(ExportFile {
                path: compressed,
                compressed: true,
            });
        }

        Err(SyncError::ExportFileNotFound(format!(
            "Tried: {} {}",
            plain.display(),
            compressed.display()
        )))
    }
}

fn parse_export_date(file_name: &str) -> Option<ExportDate> {
    let name = file_name.strip_suffix(GZIP_SUFFIX).unwrap_or(file_name);
    let mut parts = name.rsplitn(3, '.');
    let date = parts.next()?;
    let _extension = parts.next()?;
    let _module = parts.next().filter(|m| !m.is_empty())?;

    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    date.parse().ok()
}
