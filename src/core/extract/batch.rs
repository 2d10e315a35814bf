//! Typed column batches
//!
//! A [`Batch`] holds equal-length typed columns in the order of the dataset
//! definition's triples, plus the `_id` of each row. Every batch is built
//! from freshly allocated buffers.

use crate::adapters::ckan::models::Record;
use crate::core::extract::coerce;
use crate::datasets::{ColumnTriple, TypeTag};
use crate::domain::{Document, RecordId, Result, SyncError};
use serde_json::{Number, Value};

/// Values of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Text(Vec<String>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Bool(Vec<Option<bool>>),
}

impl ColumnValues {
    /// Empty buffer for `tag`
    pub fn with_capacity(tag: TypeTag, capacity: usize) -> Self {
        match tag {
            TypeTag::Text { .. } => ColumnValues::Text(Vec::with_capacity(capacity)),
            TypeTag::Int32 => ColumnValues::Int32(Vec::with_capacity(capacity)),
            TypeTag::Int64 => ColumnValues::Int64(Vec::with_capacity(capacity)),
            TypeTag::Float64 => ColumnValues::Float64(Vec::with_capacity(capacity)),
            TypeTag::Bool => ColumnValues::Bool(Vec::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::Float64(v) => v.len(),
            ColumnValues::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `row` holds the fill value for a missing source value
    pub fn is_filled(&self, row: usize) -> bool {
        match self {
            ColumnValues::Text(v) => v[row].is_empty(),
            ColumnValues::Int32(v) => v[row] == 0,
            ColumnValues::Int64(v) => v[row] == 0,
            ColumnValues::Float64(v) => v[row].is_nan(),
            ColumnValues::Bool(v) => v[row].is_none(),
        }
    }

    fn retain(&mut self, keep: &[bool]) {
        fn retain_vec<T>(values: &mut Vec<T>, keep: &[bool]) {
            let mut flags = keep.iter();
            values.retain(|_| flags.next().copied().unwrap_or(true));
        }
        match self {
            ColumnValues::Text(v) => retain_vec(v, keep),
            ColumnValues::Int32(v) => retain_vec(v, keep),
            ColumnValues::Int64(v) => retain_vec(v, keep),
            ColumnValues::Float64(v) => retain_vec(v, keep),
            ColumnValues::Bool(v) => retain_vec(v, keep),
        }
    }

    /// Integer value at `row`, for join keys
    pub fn integer(&self, row: usize) -> Option<i64> {
        match self {
            ColumnValues::Int32(v) => v.get(row).map(|x| i64::from(*x)),
            ColumnValues::Int64(v) => v.get(row).copied(),
            _ => None,
        }
    }

    /// JSON value at `row`; NaN and the bool none marker become `null`
    pub fn json(&self, row: usize) -> Value {
        match self {
            ColumnValues::Text(v) => Value::String(v[row].clone()),
            ColumnValues::Int32(v) => Value::from(v[row]),
            ColumnValues::Int64(v) => Value::from(v[row]),
            ColumnValues::Float64(v) => Number::from_f64(v[row]).map_or(Value::Null, Value::Number),
            ColumnValues::Bool(v) => v[row].map_or(Value::Null, Value::Bool),
        }
    }

    /// CSV cell at `row`; NaN and the bool none marker become empty cells
    pub fn cell(&self, row: usize) -> String {
        match self {
            ColumnValues::Text(v) => v[row].clone(),
            ColumnValues::Int32(v) => v[row].to_string(),
            ColumnValues::Int64(v) => v[row].to_string(),
            ColumnValues::Float64(v) if v[row].is_nan() => String::new(),
            ColumnValues::Float64(v) => v[row].to_string(),
            ColumnValues::Bool(v) => v[row].map(|b| b.to_string()).unwrap_or_default(),
        }
    }
}

/// One named, typed column of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub type_tag: TypeTag,
    /// Hidden columns are extracted but never written
    pub output: bool,
    pub values: ColumnValues,
}

impl Column {
    fn empty(triple: &ColumnTriple, capacity: usize) -> Self {
        Self {
            name: triple.destination().to_string(),
            type_tag: triple.type_tag(),
            output: triple.is_output(),
            values: ColumnValues::with_capacity(triple.type_tag(), capacity),
        }
    }

    /// Append `value` coerced to the column type
    pub fn push(&mut self, value: Option<&Value>) {
        let width = self.type_tag.width();
        match &mut self.values {
            ColumnValues::Text(v) => v.push(coerce::to_text(value, width)),
            ColumnValues::Int32(v) => v.push(coerce::to_i32(value)),
            ColumnValues::Int64(v) => v.push(coerce::to_i64(value)),
            ColumnValues::Float64(v) => v.push(coerce::to_f64(value)),
            ColumnValues::Bool(v) => v.push(coerce::to_bool(value)),
        }
    }

    /// Overwrite `row` with `value` coerced to the column type
    pub fn set(&mut self, row: usize, value: Option<&Value>) {
        let width = self.type_tag.width();
        match &mut self.values {
            ColumnValues::Text(v) => v[row] = coerce::to_text(value, width),
            ColumnValues::Int32(v) => v[row] = coerce::to_i32(value),
            ColumnValues::Int64(v) => v[row] = coerce::to_i64(value),
            ColumnValues::Float64(v) => v[row] = coerce::to_f64(value),
            ColumnValues::Bool(v) => v[row] = coerce::to_bool(value),
        }
    }
}

/// Equal-length typed columns for one block of documents
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    ids: Vec<RecordId>,
    columns: Vec<Column>,
}

impl Batch {
    /// Build a batch from documents of `collection`
    ///
    /// Columns sourced from `collection` are read from the documents; every
    /// other column starts filled and is populated by enrichment.
    pub fn from_documents(columns: &[ColumnTriple], collection: &str, documents: &[Document]) -> Self {
        let mut built: Vec<Column> = columns
            .iter()
            .map(|triple| Column::empty(triple, documents.len()))
            .collect();

        for document in documents {
            for (triple, column) in columns.iter().zip(built.iter_mut()) {
                let value = if triple.collection() == collection {
                    document.get(triple.field())
                } else {
                    None
                };
                column.push(value.as_ref());
            }
        }

        Self {
            ids: documents.iter().map(|d| d.id).collect(),
            columns: built,
        }
    }

    /// Assemble a batch from prepared columns
    ///
    /// # Errors
    ///
    /// Returns an error if any column length differs from the number of ids.
    pub fn new(ids: Vec<RecordId>, columns: Vec<Column>) -> Result<Self> {
        if let Some(column) = columns.iter().find(|c| c.values.len() != ids.len()) {
            return Err(SyncError::Validation(format!(
                "Column '{}' has {} rows, expected {}",
                column.name,
                column.values.len(),
                ids.len()
            )));
        }
        Ok(Self { ids, columns })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `_id` of each row
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Columns written to the output, in declaration order
    pub fn output_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.output)
    }

    /// Prepend `prefix` to every value of a text column
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or not text.
    pub fn prefix_column(&mut self, name: &str, prefix: &str) -> Result<()> {
        match self.column_mut(name).map(|c| &mut c.values) {
            Some(ColumnValues::Text(values)) => {
                for value in values.iter_mut() {
                    value.insert_str(0, prefix);
                }
                Ok(())
            }
            Some(_) => Err(SyncError::Validation(format!(
                "Cannot prefix non-text column '{name}'"
            ))),
            None => Err(SyncError::Validation(format!("No column named '{name}'"))),
        }
    }

    /// Drop rows whose `key` column holds a fill value
    ///
    /// Returns the `_id` of every dropped row.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no column named `key`.
    pub fn retain_keyed(&mut self, key: &str) -> Result<Vec<RecordId>> {
        let key_values = &self
            .column(key)
            .ok_or_else(|| SyncError::Validation(format!("No column named '{key}'")))?
            .values;
        let keep: Vec<bool> = (0..self.len()).map(|row| !key_values.is_filled(row)).collect();

        let dropped: Vec<RecordId> = self
            .ids
            .iter()
            .zip(&keep)
            .filter(|(_, kept)| !**kept)
            .map(|(id, _)| *id)
            .collect();
        if dropped.is_empty() {
            return Ok(dropped);
        }

        let mut flags = keep.iter();
        self.ids.retain(|_| flags.next().copied().unwrap_or(true));
        for column in &mut self.columns {
            column.values.retain(&keep);
        }
        Ok(dropped)
    }

    /// Output rows as JSON records
    pub fn records(&self) -> Vec<Record> {
        (0..self.len())
            .map(|row| {
                self.output_columns()
                    .map(|c| (c.name.clone(), c.values.json(row)))
                    .collect()
            })
            .collect()
    }

    /// Output rows as CSV cells, in output column order
    pub fn cells(&self) -> Vec<Vec<String>> {
        (0..self.len())
            .map(|row| self.output_columns().map(|c| c.values.cell(row)).collect())
            .collect()
    }
}
