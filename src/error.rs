//! Error types for dbf-parquet
//!
//! This module defines the error hierarchy for the conversion engine:
//! - DBF stream errors (header/record corruption)
//! - DBC container errors (decompression)
//! - Schema mapping errors (unsupported field types)
//! - Row encoding errors (value/schema disagreement)
//! - Task and CLI configuration errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors carry the field or path they refer to
//! - End of data is NOT an error: the reader returns `Ok(None)`

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the dbf-parquet application
#[derive(Error, Debug)]
pub enum ConvertError {
    /// DBF stream errors
    #[error("DBF error: {0}")]
    Dbf(#[from] DbfError),

    /// DBC container errors
    #[error("DBC error: {0}")]
    Dbc(#[from] DbcError),

    /// Schema mapping errors
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Row encoding errors
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// Conversion task errors
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Parquet writer errors
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// DBF stream errors
///
/// A well-formed stream that simply runs out of records is not an error;
/// `DbfReader::next_row` reports that as `Ok(None)`.
#[derive(Error, Debug)]
pub enum DbfError {
    /// The stream does not look like a DBF file, or ends mid-structure
    #[error("corrupt DBF stream: {reason}")]
    Corrupt { reason: String },

    /// A field's data cannot be decoded as its declared type
    #[error("corrupt DBF stream: field '{field}': {reason}")]
    CorruptField { field: String, reason: String },

    /// I/O failure while reading the stream
    #[error("failed to read DBF stream: {0}")]
    Io(#[from] std::io::Error),
}

/// DBC container errors
#[derive(Error, Debug)]
pub enum DbcError {
    /// The file is too short or its header length is inconsistent
    #[error("'{path}' is not a valid DBC container: {reason}")]
    InvalidContainer { path: PathBuf, reason: String },

    /// The imploded record section cannot be decompressed
    #[error("failed to decompress '{path}': {reason}")]
    Decompress { path: PathBuf, reason: String },

    /// I/O failure while reading or writing container files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Schema mapping errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A source field type has no target mapping (memo fields, for example)
    #[error("cannot convert DBF schema: unsupported type {kind} for field '{field}'")]
    UnsupportedFieldType { field: String, kind: String },

    /// The mapped field parameters were rejected by the parquet schema builder
    #[error("invalid target mapping for field '{field}': {source}")]
    InvalidMapping {
        field: String,
        source: parquet::errors::ParquetError,
    },
}

/// Row encoding errors
///
/// These indicate a disagreement between a row's runtime values and the
/// schema the row writer was built from. They are contract violations and
/// are never retried.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// A value's runtime type disagrees with its schema-declared type
    #[error("field '{field}': expected a {expected} value, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A row has no value for a schema field (combine mode with disjoint schemas)
    #[error("row has no value for field '{field}'")]
    MissingField { field: String },

    /// A record reached record-end with the wrong number of values
    #[error("record has {actual} values, schema expects {expected}")]
    IncompleteRecord { expected: usize, actual: usize },
}

/// Conversion task errors
///
/// Raised when a task description does not match the filesystem, before any
/// conversion I/O is performed.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Input path does not exist
    #[error("input path '{path}' does not exist")]
    InputNotFound { path: PathBuf },

    /// Combine mode was requested for a single-file input
    #[error("combine requested but input '{path}' is not a directory")]
    CombineRequiresDirectory { path: PathBuf },

    /// Combine mode needs a concrete output file, not a directory
    #[error("combine requires a concrete output file path")]
    CombineRequiresFileOutput,

    /// Directory fan-out cannot write all artifacts to a single file
    #[error("input '{input}' is a directory but output '{output}' is an existing file")]
    FanOutRequiresDirectoryOutput { input: PathBuf, output: PathBuf },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No input path was given
    #[error("no input file or directory specified")]
    MissingInput,

    /// Invalid row group size
    #[error("invalid row group size {size}: must be at least 1")]
    InvalidRowGroupSize { size: usize },

    /// Invalid ZSTD compression level
    #[error("invalid compression level {level}: must be between 1 and 22")]
    InvalidCompressionLevel { level: i32 },
}

/// Result type alias for ConvertError
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Result type alias for DbfError
pub type DbfResult<T> = std::result::Result<T, DbfError>;

/// Result type alias for DbcError
pub type DbcResult<T> = std::result::Result<T, DbcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let dbf_err = DbfError::Corrupt {
            reason: "truncated header".into(),
        };
        let convert_err: ConvertError = dbf_err.into();
        assert!(matches!(convert_err, ConvertError::Dbf(_)));

        let schema_err = SchemaError::UnsupportedFieldType {
            field: "NOTES".into(),
            kind: "MEMO".into(),
        };
        let convert_err: ConvertError = schema_err.into();
        assert!(matches!(convert_err, ConvertError::Schema(_)));
    }

    #[test]
    fn test_error_messages_name_the_field() {
        let err = EncodeError::TypeMismatch {
            field: "DT_DIAG".into(),
            expected: "date",
            actual: "character",
        };
        assert!(err.to_string().contains("DT_DIAG"));

        let err = DbfError::CorruptField {
            field: "IDADE".into(),
            reason: "blank numeric value".into(),
        };
        assert!(err.to_string().contains("IDADE"));
    }
}
