//! Deleted-records audit export reader
//!
//! The `eaudit` module exports one record per deleted source record in the
//! KE text format: `key=value` lines, with `###` closing each record.
//! Multi-valued keys carry a `:n` suffix; only the first value is kept.

use crate::adapters::exports::catalog::ExportFile;
use crate::domain::{AuditDeleteRecord, RecordId, Result, SyncError};
use std::collections::HashMap;
use std::io::BufRead;

/// Audit module name
pub const AUDIT_MODULE: &str = "eaudit";

/// Extension of the deleted-records export
pub const AUDIT_EXTENSION: &str = "deleted-export";

const RECORD_TERMINATOR: &str = "###";
const TABLE_KEY: &str = "AudTable";
const IRN_KEY: &str = "AudKey";

/// Iterator over the delete records of an audit export
pub struct AuditReader<R> {
    lines: std::io::Lines<R>,
    line_number: usize,
    skipped: usize,
}

impl AuditReader<Box<dyn BufRead + Send>> {
    /// Open a located audit export file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(file: &ExportFile) -> Result<Self> {
        tracing::info!(path = %file.path.display(), "Reading audit export");
        Ok(Self::new(file.open()?))
    }
}

impl<R: BufRead> AuditReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            skipped: 0,
        }
    }

    /// Number of records skipped for missing `AudTable`/`AudKey`
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Read `key=value` lines up to the next terminator
    ///
    /// Returns `None` at end of input when no fields were read.
    fn read_fields(&mut self) -> Option<Result<HashMap<String, String>>> {
        let mut fields = HashMap::new();

        for line in self.lines.by_ref() {
            self.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(SyncError::Io(format!(
                        "Failed to read audit export at line {}: {e}",
                        self.line_number
                    ))))
                }
            };
            let line = line.trim_end();

            if line == RECORD_TERMINATOR {
                return Some(Ok(fields));
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.split_once(':').map_or(key, |(name, _)| name);
            fields
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }

        (!fields.is_empty()).then_some(Ok(fields))
    }
}

impl<R: BufRead> Iterator for AuditReader<R> {
    type Item = Result<AuditDeleteRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let fields = match self.read_fields()? {
                Ok(fields) => fields,
                Err(e) => return Some(Err(e)),
            };

            let table = fields.get(TABLE_KEY).filter(|t| !t.is_empty());
            let irn = fields
                .get(IRN_KEY)
                .and_then(|k| k.trim().parse::<RecordId>().ok());

            match (table, irn) {
                (Some(table), Some(irn)) => {
                    return Some(Ok(AuditDeleteRecord::new(table.clone(), irn)))
                }
                _ => {
                    self.skipped += 1;
                    tracing::warn!(
                        line = self.line_number,
                        table = ?fields.get(TABLE_KEY),
                        key = ?fields.get(IRN_KEY),
                        "Skipping audit record without AudTable/AudKey"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(input: &str) -> (Vec<AuditDeleteRecord>, usize) {
        let mut reader = AuditReader::new(Cursor::new(input.to_string()));
        let records = reader.by_ref().map(|r| r.unwrap()).collect();
        (records, reader.skipped())
    }

    #[test]
    fn test_reads_records() {
        let input = "\
rownum=1
irn:1=1001
AudTable:1=ecatalogue
AudKey:1=42
###
rownum=2
AudTable=emultimedia
AudKey=7
###
";
        let (records, skipped) = read(input);
        assert_eq!(
            records,
            vec![
                AuditDeleteRecord::new("ecatalogue", RecordId::new(42)),
                AuditDeleteRecord::new("emultimedia", RecordId::new(7)),
            ]
        );
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_skips_incomplete_records() {
        let input = "AudTable=ecatalogue\n###\nAudTable=ecatalogue\nAudKey=x\n###\nAudTable=esites\nAudKey=3\n###\n";
        let (records, skipped) = read(input);
        assert_eq!(records, vec![AuditDeleteRecord::new("esites", RecordId::new(3))]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_unterminated_last_record() {
        let (records, _) = read("AudTable=ecatalogue\nAudKey=5\n");
        assert_eq!(records, vec![AuditDeleteRecord::new("ecatalogue", RecordId::new(5))]);
    }

    #[test]
    fn test_empty_input() {
        let (records, skipped) = read("");
        assert!(records.is_empty());
        assert_eq!(skipped, 0);
    }
}
