//! dbf-parquet - DATASUS DBC/DBF to Parquet Converter
//!
//! Converts legacy fixed-width DBF tables (and their DBC compressed
//! containers, as distributed by DATASUS) into self-describing Parquet
//! artifacts for analytical storage.
//!
//! # Features
//!
//! - **Schema mapping**: each DBF field maps to a Parquet primitive with a
//!   stable, position-derived field id (Character → String, Date → epoch-day
//!   INT32, Numeric → unscaled-decimal BYTE_ARRAY, Float, Logical).
//!
//! - **Streaming conversion**: rows are pulled and encoded one at a time;
//!   memory use is bounded by one Parquet row group.
//!
//! - **Directory conversion**: every `.dbc`/`.dbf` file in a directory
//!   converts independently, or all of them combine into one artifact under
//!   a first-seen union schema.
//!
//! - **DBC decompression**: the PKWARE-imploded record section of a DBC
//!   container is recovered transparently before conversion.
//!
//! # Architecture
//!
//! ```text
//!  ┌────────────┐     ┌────────────┐     ┌──────────────────────────┐
//!  │ .dbc file  │────▶│    dbc     │────▶│        DbfReader         │
//!  └────────────┘     │ decompress │     │  schema() / next_row()   │
//!  ┌────────────┐     └────────────┘     └────────────┬─────────────┘
//!  │ .dbf file  │────────────────────────────────────▶│
//!  └────────────┘                                     │ rows
//!                                                     ▼
//!                    ┌───────────────┐     ┌──────────────────────────┐
//!                    │ target_schema │────▶│        RowWriter         │
//!                    │  (TypeMapper) │     │  per-field encoders      │
//!                    └───────────────┘     └────────────┬─────────────┘
//!                                                       │ records
//!                                                       ▼
//!                                          ┌──────────────────────────┐
//!                                          │       ParquetSink        │
//!                                          │  row-group buffering     │
//!                                          └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dbf_parquet::{Converter, ConvertTask, WriterConfig};
//!
//! let task = ConvertTask::new("PNA1212.dbc".into(), None, None, false)?;
//! let mut converter = Converter::new(WriterConfig::default());
//! converter.add_task(task);
//!
//! let stats = converter.convert()?;
//! println!("{} rows in {} artifact(s)", stats.rows_converted, stats.files_converted);
//! # Ok::<(), dbf_parquet::ConvertError>(())
//! ```

pub mod config;
pub mod convert;
pub mod dbc;
pub mod dbf;
pub mod error;
pub mod parquet;
pub mod progress;

pub use config::{CliArgs, Command, ConvertConfig};
pub use convert::{union_schema, Converter, ConvertStats, ConvertTask, TaskMode};
pub use dbf::{DbfReader, DbfSchema, FieldDescriptor, FieldType, FieldValue};
pub use error::{ConvertError, Result};
pub use parquet::{target_schema, ParquetSink, RecordConsumer, RowWriter, WriterConfig};
