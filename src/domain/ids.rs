//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through the pipeline, so
//! that an export date, a KE record number and a CKAN resource id can never
//! be swapped for one another.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date of a KE EMu export, written as an eight digit `YYYYMMDD` integer
///
/// Export files carry this date in their name (`ecatalogue.export.20140522`)
/// and every dated stage is keyed by it. Ordering follows calendar order.
///
/// # Examples
///
/// ```
/// use catalogue_sync::domain::ids::ExportDate;
///
/// let date = ExportDate::new(20140522).unwrap();
/// assert_eq!(date.value(), 20140522);
/// assert!(ExportDate::new(20141332).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ExportDate(u32);

impl ExportDate {
    /// Creates a new ExportDate, rejecting values that are not a calendar date
    pub fn new(value: u32) -> Result<Self, String> {
        NaiveDate::parse_from_str(&value.to_string(), "%Y%m%d")
            .map_err(|_| format!("Invalid export date {value}. Expected format: YYYYMMDD"))?;
        Ok(Self(value))
    }

    /// Returns the raw `YYYYMMDD` value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns the date as a chrono date
    pub fn to_naive_date(&self) -> NaiveDate {
        // Validated on construction
        NaiveDate::parse_from_str(&self.0.to_string(), "%Y%m%d").unwrap_or_default()
    }
}

impl TryFrom<u32> for ExportDate {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExportDate> for u32 {
    fn from(date: ExportDate) -> Self {
        date.0
    }
}

impl fmt::Display for ExportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExportDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid export date '{s}'. Expected format: YYYYMMDD"))?;
        Self::new(value)
    }
}

/// KE EMu internal record number (IRN), used as the document `_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(i64);

impl RecordId {
    /// Creates a new RecordId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| format!("Invalid record id '{s}'"))
    }
}

/// CKAN datastore resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub(crate) String);

impl ResourceId {
    /// Creates a new ResourceId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Resource ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the resource ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
