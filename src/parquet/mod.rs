//! Parquet target format
//!
//! # Module Structure
//!
//! - `schema`: DBF schema → Parquet message type mapping
//! - `consumer`: record consumer contract and the buffering Parquet sink
//! - `row`: per-type field encoders and the row writer

pub mod consumer;
pub mod row;
pub mod schema;

pub use consumer::{ParquetSink, RecordConsumer, WriterConfig};
pub use row::RowWriter;
pub use schema::{target_field, target_schema};
