//! DBF data model
//!
//! Field descriptors, schemas and typed row values shared by the reader and
//! the conversion engine. Schemas are parsed once from a file header and are
//! immutable afterward; rows are transient and produced one at a time.

use crate::error::{DbfError, DbfResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// DBF field type, from the type byte of a field descriptor.
///
/// The converter maps the first five; memo and unknown types are
/// representable so that schema mapping can report them by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 'C' - fixed-width text
    Character,
    /// 'D' - calendar date, stored as YYYYMMDD text
    Date,
    /// 'N' - decimal number, stored as right-justified text
    Numeric,
    /// 'F' - floating point number, stored as text
    Float,
    /// 'L' - single-character boolean
    Logical,
    /// 'M' - memo reference (not convertible)
    Memo,
    /// Any other type byte (not convertible)
    Unknown(u8),
}

impl FieldType {
    /// Decode a field descriptor's type byte.
    pub fn from_code(code: u8) -> Self {
        match code {
            b'C' => FieldType::Character,
            b'D' => FieldType::Date,
            b'N' => FieldType::Numeric,
            b'F' => FieldType::Float,
            b'L' => FieldType::Logical,
            b'M' => FieldType::Memo,
            other => FieldType::Unknown(other),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Character => write!(f, "CHARACTER"),
            FieldType::Date => write!(f, "DATE"),
            FieldType::Numeric => write!(f, "NUMERIC"),
            FieldType::Float => write!(f, "FLOAT"),
            FieldType::Logical => write!(f, "LOGICAL"),
            FieldType::Memo => write!(f, "MEMO"),
            FieldType::Unknown(code) => write!(f, "UNKNOWN(0x{code:02X})"),
        }
    }
}

/// One field of a DBF schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, unique within its schema
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
    /// Width of the field's record slot in bytes
    pub length: u8,
    /// Digits after the decimal point (numeric fields only)
    pub decimal_count: u8,
}

impl FieldDescriptor {
    /// Create a descriptor, enforcing the header invariants: non-empty name,
    /// positive length, and decimal count within the length for numerics.
    pub fn new(
        name: String,
        field_type: FieldType,
        length: u8,
        decimal_count: u8,
    ) -> DbfResult<Self> {
        if name.is_empty() {
            return Err(DbfError::Corrupt {
                reason: "field descriptor with empty name".into(),
            });
        }
        if length == 0 {
            return Err(DbfError::CorruptField {
                field: name,
                reason: "field length is zero".into(),
            });
        }
        if field_type == FieldType::Numeric && decimal_count > length {
            return Err(DbfError::CorruptField {
                field: name,
                reason: format!("decimal count {decimal_count} exceeds field length {length}"),
            });
        }
        Ok(Self {
            name,
            field_type,
            length,
            decimal_count,
        })
    }
}

/// An ordered DBF schema plus the root name used for the target schema.
///
/// Field order is semantically significant: it defines both the source
/// record layout and the target field ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfSchema {
    /// Root name for the converted schema
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,
}

impl DbfSchema {
    /// Root name used when the caller does not supply one.
    pub const DEFAULT_NAME: &'static str = "DBFFile";

    /// Create a schema with the given name, or the default.
    pub fn new(name: Option<&str>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.unwrap_or(Self::DEFAULT_NAME).to_string(),
            fields,
        }
    }

    /// Position of a field by name, if present.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single decoded field value.
///
/// The source format has no null representation; every record slot decodes
/// to a value or the record is corrupt.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Character(String),
    Date(NaiveDate),
    Numeric(Decimal),
    Float(f32),
    Logical(bool),
}

impl FieldValue {
    /// Human-readable kind, for mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Character(_) => "character",
            FieldValue::Date(_) => "date",
            FieldValue::Numeric(_) => "numeric",
            FieldValue::Float(_) => "float",
            FieldValue::Logical(_) => "logical",
        }
    }
}

/// One decoded record: a value per schema field, in declaration order.
#[derive(Debug, Clone)]
pub struct DbfRow {
    schema: Arc<DbfSchema>,
    values: Vec<FieldValue>,
}

impl DbfRow {
    pub(crate) fn new(schema: Arc<DbfSchema>, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(schema.fields.len(), values.len());
        Self { schema, values }
    }

    /// The schema this row was decoded against.
    pub fn schema(&self) -> &DbfSchema {
        &self.schema
    }

    /// Value lookup by field name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema.field_index(name).map(|i| &self.values[i])
    }

    /// Values in schema order.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_from_code() {
        assert_eq!(FieldType::from_code(b'C'), FieldType::Character);
        assert_eq!(FieldType::from_code(b'D'), FieldType::Date);
        assert_eq!(FieldType::from_code(b'N'), FieldType::Numeric);
        assert_eq!(FieldType::from_code(b'F'), FieldType::Float);
        assert_eq!(FieldType::from_code(b'L'), FieldType::Logical);
        assert_eq!(FieldType::from_code(b'M'), FieldType::Memo);
        assert_eq!(FieldType::from_code(b'@'), FieldType::Unknown(b'@'));
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::Numeric.to_string(), "NUMERIC");
        assert_eq!(FieldType::Unknown(0x40).to_string(), "UNKNOWN(0x40)");
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(FieldDescriptor::new("UF".into(), FieldType::Character, 2, 0).is_ok());
        assert!(FieldDescriptor::new("".into(), FieldType::Character, 2, 0).is_err());
        assert!(FieldDescriptor::new("N".into(), FieldType::Numeric, 4, 0).is_ok());
        // decimal count larger than the field width
        assert!(FieldDescriptor::new("N".into(), FieldType::Numeric, 2, 3).is_err());
        assert!(FieldDescriptor::new("X".into(), FieldType::Character, 0, 0).is_err());
    }

    #[test]
    fn test_schema_default_name() {
        let schema = DbfSchema::new(None, vec![]);
        assert_eq!(schema.name, "DBFFile");

        let schema = DbfSchema::new(Some("PainelOncologia"), vec![]);
        assert_eq!(schema.name, "PainelOncologia");
    }

    #[test]
    fn test_row_lookup_by_name() {
        let schema = Arc::new(DbfSchema::new(
            None,
            vec![
                FieldDescriptor::new("UF".into(), FieldType::Character, 2, 0).unwrap(),
                FieldDescriptor::new("IDADE".into(), FieldType::Numeric, 3, 0).unwrap(),
            ],
        ));
        let row = DbfRow::new(
            schema,
            vec![
                FieldValue::Character("SP".into()),
                FieldValue::Numeric(Decimal::from(42)),
            ],
        );

        assert_eq!(row.get("UF"), Some(&FieldValue::Character("SP".into())));
        assert_eq!(row.get("IDADE"), Some(&FieldValue::Numeric(42.into())));
        assert_eq!(row.get("MISSING"), None);
    }
}
