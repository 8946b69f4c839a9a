//! Record consumer and the Parquet-backed sink
//!
//! `RecordConsumer` is the narrow contract the row writer talks to: record
//! and field markers plus one primitive write per field. `ParquetSink` is the
//! production implementation; it buffers the current record until record-end
//! (an abandoned record never reaches the file), accumulates whole columns,
//! and flushes a row group every `row_group_size` records through the
//! low-level Parquet column writers.

use crate::error::{ConvertError, EncodeError, Result};
use parquet::basic::{Compression, Type as PhysicalType, ZstdLevel};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::errors::ParquetError;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::{EnabledStatistics, WriterProperties, WriterPropertiesPtr};
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::TypePtr;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Sink contract for one encoded record stream.
///
/// Calls arrive as: `start_record`, then per field in schema order
/// `start_field` / one `add_*` / `end_field`, then `end_record`.
pub trait RecordConsumer {
    fn start_record(&mut self) -> Result<()>;
    fn start_field(&mut self, name: &str, id: usize) -> Result<()>;
    fn add_bytes(&mut self, value: &[u8]) -> Result<()>;
    fn add_i32(&mut self, value: i32) -> Result<()>;
    fn add_f32(&mut self, value: f32) -> Result<()>;
    fn add_bool(&mut self, value: bool) -> Result<()>;
    fn end_field(&mut self, name: &str, id: usize) -> Result<()>;
    fn end_record(&mut self) -> Result<()>;
}

/// Configuration for the Parquet writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Number of records per row group
    pub row_group_size: usize,
    /// ZSTD compression level (1-22)
    pub compression_level: i32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            row_group_size: 100_000,
            compression_level: 3,
        }
    }
}

/// One buffered primitive value of the record being assembled.
enum PendingValue {
    Bytes(ByteArray),
    Int32(i32),
    Float(f32),
    Bool(bool),
}

/// Column accumulator matching one leaf of the target schema.
enum ColumnValues {
    Bytes(Vec<ByteArray>),
    Int32(Vec<i32>),
    Float(Vec<f32>),
    Bool(Vec<bool>),
}

impl ColumnValues {
    fn for_physical_type(physical: PhysicalType) -> Result<Self> {
        match physical {
            PhysicalType::BYTE_ARRAY => Ok(ColumnValues::Bytes(Vec::new())),
            PhysicalType::INT32 => Ok(ColumnValues::Int32(Vec::new())),
            PhysicalType::FLOAT => Ok(ColumnValues::Float(Vec::new())),
            PhysicalType::BOOLEAN => Ok(ColumnValues::Bool(Vec::new())),
            other => Err(ConvertError::Parquet(ParquetError::General(format!(
                "unexpected physical type {other} in target schema"
            )))),
        }
    }
}

/// Streaming Parquet writer implementing [`RecordConsumer`].
pub struct ParquetSink<W: Write + Send> {
    writer: SerializedFileWriter<W>,
    columns: Vec<ColumnValues>,
    pending: Vec<PendingValue>,
    in_record: bool,
    buffered_rows: usize,
    row_group_size: usize,
    rows_written: u64,
}

impl ParquetSink<File> {
    /// Create a sink writing to a new file at `path`.
    pub fn create(
        path: &Path,
        schema: TypePtr,
        config: &WriterConfig,
        sources: &[String],
    ) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(file, schema, config, sources)
    }
}

impl<W: Write + Send> ParquetSink<W> {
    /// Create a sink over any writable output.
    ///
    /// `sources` are recorded as key-value metadata in the file footer so an
    /// artifact names the DBF file(s) it was converted from.
    pub fn new(
        output: W,
        schema: TypePtr,
        config: &WriterConfig,
        sources: &[String],
    ) -> Result<Self> {
        let columns = schema
            .get_fields()
            .iter()
            .map(|field| ColumnValues::for_physical_type(field.get_physical_type()))
            .collect::<Result<Vec<_>>>()?;

        let props = writer_properties(config, sources)?;
        let writer = SerializedFileWriter::new(output, schema, props)?;

        Ok(Self {
            writer,
            pending: Vec::with_capacity(columns.len()),
            columns,
            in_record: false,
            buffered_rows: 0,
            row_group_size: config.row_group_size.max(1),
            rows_written: 0,
        })
    }

    /// Flush buffered records and finalize the file footer.
    ///
    /// Returns the total number of records written.
    pub fn close(mut self) -> Result<u64> {
        self.flush_row_group()?;
        self.writer.close()?;
        Ok(self.rows_written)
    }

    fn flush_row_group(&mut self) -> Result<()> {
        if self.buffered_rows == 0 {
            return Ok(());
        }

        let mut row_group = self.writer.next_row_group()?;
        let mut columns = self.columns.iter_mut();
        while let Some(mut column_writer) = row_group.next_column()? {
            let column = columns.next().ok_or_else(|| {
                ParquetError::General("more column writers than buffered columns".into())
            })?;
            match (column_writer.untyped(), &mut *column) {
                (ColumnWriter::ByteArrayColumnWriter(w), ColumnValues::Bytes(values)) => {
                    w.write_batch(values, None, None)?;
                    values.clear();
                }
                (ColumnWriter::Int32ColumnWriter(w), ColumnValues::Int32(values)) => {
                    w.write_batch(values, None, None)?;
                    values.clear();
                }
                (ColumnWriter::FloatColumnWriter(w), ColumnValues::Float(values)) => {
                    w.write_batch(values, None, None)?;
                    values.clear();
                }
                (ColumnWriter::BoolColumnWriter(w), ColumnValues::Bool(values)) => {
                    w.write_batch(values, None, None)?;
                    values.clear();
                }
                _ => {
                    return Err(ConvertError::Parquet(ParquetError::General(
                        "column writer does not match buffered values".into(),
                    )))
                }
            }
            column_writer.close()?;
        }
        row_group.close()?;

        self.rows_written += self.buffered_rows as u64;
        self.buffered_rows = 0;
        Ok(())
    }
}

impl<W: Write + Send> RecordConsumer for ParquetSink<W> {
    fn start_record(&mut self) -> Result<()> {
        debug_assert!(!self.in_record, "start_record inside an open record");
        self.in_record = true;
        self.pending.clear();
        Ok(())
    }

    fn start_field(&mut self, _name: &str, id: usize) -> Result<()> {
        debug_assert_eq!(id, self.pending.len(), "fields must arrive in schema order");
        Ok(())
    }

    fn add_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.pending.push(PendingValue::Bytes(value.to_vec().into()));
        Ok(())
    }

    fn add_i32(&mut self, value: i32) -> Result<()> {
        self.pending.push(PendingValue::Int32(value));
        Ok(())
    }

    fn add_f32(&mut self, value: f32) -> Result<()> {
        self.pending.push(PendingValue::Float(value));
        Ok(())
    }

    fn add_bool(&mut self, value: bool) -> Result<()> {
        self.pending.push(PendingValue::Bool(value));
        Ok(())
    }

    fn end_field(&mut self, _name: &str, _id: usize) -> Result<()> {
        Ok(())
    }

    fn end_record(&mut self) -> Result<()> {
        debug_assert!(self.in_record, "end_record without start_record");
        self.in_record = false;

        if self.pending.len() != self.columns.len() {
            return Err(EncodeError::IncompleteRecord {
                expected: self.columns.len(),
                actual: self.pending.len(),
            }
            .into());
        }

        for (value, column) in self.pending.drain(..).zip(self.columns.iter_mut()) {
            match (value, column) {
                (PendingValue::Bytes(v), ColumnValues::Bytes(col)) => col.push(v),
                (PendingValue::Int32(v), ColumnValues::Int32(col)) => col.push(v),
                (PendingValue::Float(v), ColumnValues::Float(col)) => col.push(v),
                (PendingValue::Bool(v), ColumnValues::Bool(col)) => col.push(v),
                _ => {
                    return Err(ConvertError::Parquet(ParquetError::General(
                        "record value kind does not match its column".into(),
                    )))
                }
            }
        }

        self.buffered_rows += 1;
        if self.buffered_rows >= self.row_group_size {
            self.flush_row_group()?;
        }
        Ok(())
    }
}

/// Build writer properties: ZSTD compression, chunk statistics, and the
/// source-file metadata entry.
fn writer_properties(config: &WriterConfig, sources: &[String]) -> Result<WriterPropertiesPtr> {
    let level = ZstdLevel::try_new(config.compression_level)
        .map_err(ConvertError::Parquet)?;

    let mut builder = WriterProperties::builder()
        .set_compression(Compression::ZSTD(level))
        .set_statistics_enabled(EnabledStatistics::Chunk)
        .set_max_row_group_size(config.row_group_size.max(1))
        .set_created_by(format!("dbf-parquet {}", env!("CARGO_PKG_VERSION")));

    if !sources.is_empty() {
        builder = builder.set_key_value_metadata(Some(vec![KeyValue::new(
            "dbf.sources".to_string(),
            sources.join(","),
        )]));
    }

    Ok(Arc::new(builder.build()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbf::{DbfSchema, FieldDescriptor, FieldType};
    use crate::parquet::schema::target_schema;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use tempfile::tempdir;

    fn test_schema() -> TypePtr {
        let schema = DbfSchema::new(
            Some("sink"),
            vec![
                FieldDescriptor::new("NAME".into(), FieldType::Character, 8, 0).unwrap(),
                FieldDescriptor::new("AGE".into(), FieldType::Numeric, 4, 0).unwrap(),
            ],
        );
        target_schema(&schema).unwrap()
    }

    fn write_record(sink: &mut ParquetSink<File>, name: &str, age: &[u8]) {
        sink.start_record().unwrap();
        sink.start_field("NAME", 0).unwrap();
        sink.add_bytes(name.as_bytes()).unwrap();
        sink.end_field("NAME", 0).unwrap();
        sink.start_field("AGE", 1).unwrap();
        sink.add_bytes(age).unwrap();
        sink.end_field("AGE", 1).unwrap();
        sink.end_record().unwrap();
    }

    #[test]
    fn test_rows_buffer_and_flush_in_row_groups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sink.parquet");
        let config = WriterConfig {
            row_group_size: 2,
            compression_level: 3,
        };

        let mut sink =
            ParquetSink::create(&path, test_schema(), &config, &["sink.dbf".into()]).unwrap();
        for i in 0..5u8 {
            write_record(&mut sink, "row", &[i]);
        }
        let written = sink.close().unwrap();
        assert_eq!(written, 5);

        let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
        let meta = reader.metadata();
        assert_eq!(meta.file_metadata().num_rows(), 5);
        // 2 + 2 + 1 with a row group size of two
        assert_eq!(meta.num_row_groups(), 3);

        let kv = meta.file_metadata().key_value_metadata().unwrap();
        assert!(kv
            .iter()
            .any(|e| e.key == "dbf.sources" && e.value.as_deref() == Some("sink.dbf")));
    }

    #[test]
    fn test_incomplete_record_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.parquet");

        let mut sink = ParquetSink::create(
            &path,
            test_schema(),
            &WriterConfig::default(),
            &[],
        )
        .unwrap();

        sink.start_record().unwrap();
        sink.start_field("NAME", 0).unwrap();
        sink.add_bytes(b"only").unwrap();
        sink.end_field("NAME", 0).unwrap();
        let err = sink.end_record().unwrap_err();
        assert!(
            matches!(
                err,
                ConvertError::Encode(EncodeError::IncompleteRecord { expected: 2, actual: 1 })
            ),
            "{err}"
        );
    }

    #[test]
    fn test_empty_file_has_zero_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.parquet");

        let sink =
            ParquetSink::create(&path, test_schema(), &WriterConfig::default(), &[]).unwrap();
        assert_eq!(sink.close().unwrap(), 0);

        let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 0);
    }
}
