//! Column triples and type tags
//!
//! Every dataset definition is a list of `(source, destination, type)`
//! triples. The source is namespaced as `collection.field`, the destination
//! is the flat output name and the type tag drives both the fill policy for
//! masked values and the remote field type.

use crate::domain::{Result, SyncError};
use std::fmt;
use std::str::FromStr;

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Free text, with an optional maximum width taken from `string:<width>`
    Text { width: Option<usize> },
    /// 32-bit signed integer; the canonical width for join keys
    Int32,
    /// 64-bit signed integer
    Int64,
    /// Double precision float
    Float64,
    /// Boolean with a none marker for missing values
    Bool,
}

impl TypeTag {
    /// Whether this tag is one of the signed integer widths
    pub fn is_integer(&self) -> bool {
        matches!(self, TypeTag::Int32 | TypeTag::Int64)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, TypeTag::Text { .. })
    }

    /// Character limit of a `string:N` column
    pub fn width(&self) -> Option<usize> {
        match self {
            TypeTag::Text { width } => *width,
            _ => None,
        }
    }

    /// CKAN datastore field type for this tag
    ///
    /// Precedence: signed integers map to `integer`, floats to `float`,
    /// booleans to `bool` and everything else to case-insensitive text.
    pub fn remote_type(&self) -> &'static str {
        match self {
            TypeTag::Int32 | TypeTag::Int64 => "integer",
            TypeTag::Float64 => "float",
            TypeTag::Bool => "bool",
            TypeTag::Text { .. } => "citext",
        }
    }
}

impl FromStr for TypeTag {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_lowercase();

        if let Some(rest) = tag.strip_prefix("string") {
            return match rest.strip_prefix(':') {
                None if rest.is_empty() => Ok(TypeTag::Text { width: None }),
                Some(width) => width
                    .parse::<usize>()
                    .map(|w| TypeTag::Text { width: Some(w) })
                    .map_err(|_| SyncError::UnknownTypeTag(s.to_string())),
                None => Err(SyncError::UnknownTypeTag(s.to_string())),
            };
        }

        match tag.as_str() {
            "int32" => Ok(TypeTag::Int32),
            "int64" => Ok(TypeTag::Int64),
            "float32" | "float64" => Ok(TypeTag::Float64),
            "bool" => Ok(TypeTag::Bool),
            _ => Err(SyncError::UnknownTypeTag(s.to_string())),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Text { width: Some(w) } => write!(f, "string:{w}"),
            TypeTag::Text { width: None } => write!(f, "string"),
            TypeTag::Int32 => write!(f, "int32"),
            TypeTag::Int64 => write!(f, "int64"),
            TypeTag::Float64 => write!(f, "float64"),
            TypeTag::Bool => write!(f, "bool"),
        }
    }
}

/// One `(source, destination, type)` entry of a dataset definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTriple {
    collection: String,
    field: String,
    destination: String,
    type_tag: TypeTag,
}

impl ColumnTriple {
    /// Parse a triple from its static-table form
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not `collection.field`, the
    /// destination is empty, or the type tag is unknown.
    pub fn new(source: &str, destination: &str, type_tag: &str) -> Result<Self> {
        let (collection, field) = source
            .split_once('.')
            .filter(|(c, f)| !c.is_empty() && !f.is_empty() && !f.contains('.'))
            .ok_or_else(|| {
                SyncError::Definition(format!(
                    "Source field '{source}' must be namespaced as collection.field"
                ))
            })?;

        if destination.trim().is_empty() {
            return Err(SyncError::Definition(format!(
                "Destination field for '{source}' cannot be empty"
            )));
        }

        Ok(Self {
            collection: collection.to_string(),
            field: field.to_string(),
            destination: destination.to_string(),
            type_tag: type_tag.parse()?,
        })
    }

    /// Source collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Source field name within the collection
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Fully qualified source, `collection.field`
    pub fn source(&self) -> String {
        format!("{}.{}", self.collection, self.field)
    }

    /// Flat output name
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Declared type
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Hidden columns start with `_`; they are extracted but never output
    pub fn is_output(&self) -> bool {
        !self.destination.starts_with('_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("string", TypeTag::Text { width: None } ; "plain string")]
    #[test_case("string:100", TypeTag::Text { width: Some(100) } ; "string with width")]
    #[test_case("int32", TypeTag::Int32 ; "int32")]
    #[test_case("int64", TypeTag::Int64 ; "int64")]
    #[test_case("float64", TypeTag::Float64 ; "float64")]
    #[test_case("float32", TypeTag::Float64 ; "float32 widens")]
    #[test_case("bool", TypeTag::Bool ; "bool")]
    fn test_type_tag_parse(input: &str, expected: TypeTag) {
        assert_eq!(input.parse::<TypeTag>().unwrap(), expected);
    }

    #[test_case("decimal" ; "unknown name")]
    #[test_case("string:wide" ; "non numeric width")]
    #[test_case("stringy" ; "string prefix only")]
    #[test_case("" ; "empty")]
    fn test_type_tag_unknown(input: &str) {
        let err = input.parse::<TypeTag>().unwrap_err();
        assert!(matches!(err, SyncError::UnknownTypeTag(_)));
    }

    #[test_case(TypeTag::Int32, "integer")]
    #[test_case(TypeTag::Int64, "integer")]
    #[test_case(TypeTag::Float64, "float")]
    #[test_case(TypeTag::Bool, "bool")]
    #[test_case(TypeTag::Text { width: Some(36) }, "citext")]
    fn test_remote_type(tag: TypeTag, expected: &str) {
        assert_eq!(tag.remote_type(), expected);
    }

    #[test]
    fn test_column_triple_parts() {
        let col = ColumnTriple::new("ecatalogue.DarCatalogNumber", "catalogNumber", "string:100")
            .unwrap();
        assert_eq!(col.collection(), "ecatalogue");
        assert_eq!(col.field(), "DarCatalogNumber");
        assert_eq!(col.source(), "ecatalogue.DarCatalogNumber");
        assert!(col.is_output());
    }

    #[test]
    fn test_hidden_column() {
        let col = ColumnTriple::new("ecatalogue._id", "_id", "int32").unwrap();
        assert!(!col.is_output());
    }

    #[test]
    fn test_column_triple_requires_namespace() {
        assert!(ColumnTriple::new("DarCatalogNumber", "catalogNumber", "string").is_err());
        assert!(ColumnTriple::new("a.b.c", "x", "string").is_err());
        assert!(ColumnTriple::new("ecatalogue.Field", " ", "string").is_err());
    }
}
