//! Row and field encoding
//!
//! One encoding strategy per DBF type, dispatched through a closed enum
//! rather than per-value type inspection. The row writer drives the encoders
//! across a row in target-schema order, bracketing each value with
//! field-start/field-end markers and the whole row with record markers.

use crate::dbf::{DbfRow, DbfSchema, FieldDescriptor, FieldType, FieldValue};
use crate::error::{EncodeError, Result, SchemaError};
use crate::parquet::consumer::RecordConsumer;
use chrono::NaiveDate;

/// Value encoding strategy for one target primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldEncoder {
    Character,
    Date,
    Numeric,
    Float,
    Logical,
}

impl FieldEncoder {
    fn for_field(field: &FieldDescriptor) -> std::result::Result<Self, SchemaError> {
        match field.field_type {
            FieldType::Character => Ok(FieldEncoder::Character),
            FieldType::Date => Ok(FieldEncoder::Date),
            FieldType::Numeric => Ok(FieldEncoder::Numeric),
            FieldType::Float => Ok(FieldEncoder::Float),
            FieldType::Logical => Ok(FieldEncoder::Logical),
            unsupported => Err(SchemaError::UnsupportedFieldType {
                field: field.name.clone(),
                kind: unsupported.to_string(),
            }),
        }
    }

    fn expected(self) -> &'static str {
        match self {
            FieldEncoder::Character => "character",
            FieldEncoder::Date => "date",
            FieldEncoder::Numeric => "numeric",
            FieldEncoder::Float => "float",
            FieldEncoder::Logical => "logical",
        }
    }

    /// Write exactly one primitive value to the consumer.
    fn encode(
        self,
        field: &str,
        value: &FieldValue,
        consumer: &mut dyn RecordConsumer,
    ) -> Result<()> {
        match (self, value) {
            (FieldEncoder::Character, FieldValue::Character(text)) => {
                consumer.add_bytes(text.as_bytes())
            }
            (FieldEncoder::Date, FieldValue::Date(date)) => {
                consumer.add_i32(days_since_epoch(*date))
            }
            (FieldEncoder::Numeric, FieldValue::Numeric(decimal)) => {
                // The scale is carried by the schema annotation; only the
                // unscaled integer goes into the value bytes.
                consumer.add_bytes(&unscaled_be_bytes(decimal.mantissa()))
            }
            (FieldEncoder::Float, FieldValue::Float(v)) => consumer.add_f32(*v),
            (FieldEncoder::Logical, FieldValue::Logical(v)) => consumer.add_bool(*v),
            (encoder, value) => Err(EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: encoder.expected(),
                actual: value.kind(),
            }
            .into()),
        }
    }
}

/// One schema field's writer: encoder plus the field markers around it.
struct FieldWriter {
    name: String,
    id: usize,
    encoder: FieldEncoder,
}

impl FieldWriter {
    fn write(&self, value: &FieldValue, consumer: &mut dyn RecordConsumer) -> Result<()> {
        consumer.start_field(&self.name, self.id)?;
        self.encoder.encode(&self.name, value, consumer)?;
        consumer.end_field(&self.name, self.id)?;
        Ok(())
    }
}

/// Writes whole rows in target-schema order.
///
/// Values are looked up by field name, so a writer built from a union schema
/// serves rows from any of the unioned files; a union field missing from a
/// row's own schema fails with `MissingField`.
pub struct RowWriter {
    writers: Vec<FieldWriter>,
}

impl RowWriter {
    /// Build one writer per field of `schema`, in declaration order.
    pub fn new(schema: &DbfSchema) -> std::result::Result<Self, SchemaError> {
        let mut writers = Vec::with_capacity(schema.fields.len());
        for (id, field) in schema.fields.iter().enumerate() {
            writers.push(FieldWriter {
                name: field.name.clone(),
                id,
                encoder: FieldEncoder::for_field(field)?,
            });
        }
        Ok(Self { writers })
    }

    /// Encode one row as one record.
    ///
    /// On any field failure the error propagates immediately; the consumer's
    /// record never reaches record-end, so a buffering sink drops it.
    pub fn write(&self, row: &DbfRow, consumer: &mut dyn RecordConsumer) -> Result<()> {
        consumer.start_record()?;
        for writer in &self.writers {
            let value = row
                .get(&writer.name)
                .ok_or_else(|| EncodeError::MissingField {
                    field: writer.name.clone(),
                })?;
            writer.write(value, consumer)?;
        }
        consumer.end_record()?;
        Ok(())
    }
}

/// Whole days between the Unix epoch and `date`.
fn days_since_epoch(date: NaiveDate) -> i32 {
    // NaiveDate::default() is 1970-01-01
    date.signed_duration_since(NaiveDate::default()).num_days() as i32
}

/// Minimal big-endian two's-complement representation of an unscaled
/// decimal value, sign bytes trimmed but never empty.
pub(crate) fn unscaled_be_bytes(value: i128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant_zero = bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0;
        let redundant_ff = bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0;
        if redundant_zero || redundant_ff {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbf::FieldDescriptor;
    use crate::error::ConvertError;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    /// Consumer that records the event stream for assertions.
    #[derive(Default)]
    struct EventConsumer {
        events: Vec<String>,
    }

    impl RecordConsumer for EventConsumer {
        fn start_record(&mut self) -> Result<()> {
            self.events.push("start_record".into());
            Ok(())
        }
        fn start_field(&mut self, name: &str, id: usize) -> Result<()> {
            self.events.push(format!("start_field {name} {id}"));
            Ok(())
        }
        fn add_bytes(&mut self, value: &[u8]) -> Result<()> {
            self.events.push(format!("bytes {value:?}"));
            Ok(())
        }
        fn add_i32(&mut self, value: i32) -> Result<()> {
            self.events.push(format!("i32 {value}"));
            Ok(())
        }
        fn add_f32(&mut self, value: f32) -> Result<()> {
            self.events.push(format!("f32 {value}"));
            Ok(())
        }
        fn add_bool(&mut self, value: bool) -> Result<()> {
            self.events.push(format!("bool {value}"));
            Ok(())
        }
        fn end_field(&mut self, name: &str, id: usize) -> Result<()> {
            self.events.push(format!("end_field {name} {id}"));
            Ok(())
        }
        fn end_record(&mut self) -> Result<()> {
            self.events.push("end_record".into());
            Ok(())
        }
    }

    fn schema() -> Arc<DbfSchema> {
        Arc::new(DbfSchema::new(
            None,
            vec![
                FieldDescriptor::new("UF".into(), FieldType::Character, 2, 0).unwrap(),
                FieldDescriptor::new("DT".into(), FieldType::Date, 8, 0).unwrap(),
                FieldDescriptor::new("VAL".into(), FieldType::Numeric, 8, 2).unwrap(),
            ],
        ))
    }

    fn row(schema: &Arc<DbfSchema>) -> DbfRow {
        DbfRow::new(
            Arc::clone(schema),
            vec![
                FieldValue::Character("SP".into()),
                FieldValue::Date(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()),
                FieldValue::Numeric("42.00".parse().unwrap()),
            ],
        )
    }

    #[test]
    fn test_record_event_order() {
        let schema = schema();
        let writer = RowWriter::new(&schema).unwrap();
        let mut consumer = EventConsumer::default();

        writer.write(&row(&schema), &mut consumer).unwrap();

        assert_eq!(
            consumer.events,
            vec![
                "start_record",
                "start_field UF 0",
                "bytes [83, 80]",
                "end_field UF 0",
                "start_field DT 1",
                "i32 19388",
                "end_field DT 1",
                "start_field VAL 2",
                "bytes [16, 104]",
                "end_field VAL 2",
                "end_record",
            ]
        );
    }

    #[test]
    fn test_type_mismatch_is_fatal() {
        let schema = schema();
        let writer = RowWriter::new(&schema).unwrap();
        let mut consumer = EventConsumer::default();

        let bad_row = DbfRow::new(
            Arc::clone(&schema),
            vec![
                FieldValue::Character("SP".into()),
                FieldValue::Character("not a date".into()),
                FieldValue::Numeric(Decimal::from(1)),
            ],
        );

        let err = writer.write(&bad_row, &mut consumer).unwrap_err();
        match err {
            ConvertError::Encode(EncodeError::TypeMismatch {
                field,
                expected,
                actual,
            }) => {
                assert_eq!(field, "DT");
                assert_eq!(expected, "date");
                assert_eq!(actual, "character");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
        // The record was abandoned before end_record
        assert_ne!(consumer.events.last().map(String::as_str), Some("end_record"));
    }

    #[test]
    fn test_missing_union_field() {
        // Writer built from a wider (union) schema than the row's own
        let union = Arc::new(DbfSchema::new(
            None,
            vec![
                FieldDescriptor::new("UF".into(), FieldType::Character, 2, 0).unwrap(),
                FieldDescriptor::new("EXTRA".into(), FieldType::Character, 4, 0).unwrap(),
            ],
        ));
        let narrow = Arc::new(DbfSchema::new(
            None,
            vec![FieldDescriptor::new("UF".into(), FieldType::Character, 2, 0).unwrap()],
        ));

        let writer = RowWriter::new(&union).unwrap();
        let row = DbfRow::new(narrow, vec![FieldValue::Character("SP".into())]);
        let mut consumer = EventConsumer::default();

        let err = writer.write(&row, &mut consumer).unwrap_err();
        assert!(
            matches!(
                err,
                ConvertError::Encode(EncodeError::MissingField { ref field }) if field == "EXTRA"
            ),
            "{err}"
        );
    }

    #[test]
    fn test_unsupported_type_rejected_at_construction() {
        let schema = DbfSchema::new(
            None,
            vec![FieldDescriptor::new("NOTES".into(), FieldType::Memo, 10, 0).unwrap()],
        );
        assert!(matches!(
            RowWriter::new(&schema),
            Err(SchemaError::UnsupportedFieldType { .. })
        ));
    }

    #[test]
    fn test_days_since_epoch() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(days_since_epoch(d(1970, 1, 1)), 0);
        assert_eq!(days_since_epoch(d(1970, 1, 2)), 1);
        assert_eq!(days_since_epoch(d(1969, 12, 31)), -1);
        assert_eq!(days_since_epoch(d(2023, 1, 31)), 19388);
    }

    #[test]
    fn test_unscaled_be_bytes() {
        assert_eq!(unscaled_be_bytes(0), vec![0x00]);
        assert_eq!(unscaled_be_bytes(1), vec![0x01]);
        assert_eq!(unscaled_be_bytes(127), vec![0x7F]);
        // 128 needs a leading zero to stay positive
        assert_eq!(unscaled_be_bytes(128), vec![0x00, 0x80]);
        assert_eq!(unscaled_be_bytes(4200), vec![0x10, 0x68]);
        assert_eq!(unscaled_be_bytes(-1), vec![0xFF]);
        assert_eq!(unscaled_be_bytes(-128), vec![0x80]);
        assert_eq!(unscaled_be_bytes(-129), vec![0xFF, 0x7F]);
        assert_eq!(unscaled_be_bytes(65536), vec![0x01, 0x00, 0x00]);
    }
}
