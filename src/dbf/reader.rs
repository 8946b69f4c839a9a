//! Streaming DBF reader
//!
//! Parses the table header once, then produces decoded rows one at a time
//! from any `io::Read`. End of data is a normal `Ok(None)`, reported when the
//! stream reaches the end-of-file marker or runs out cleanly at a record
//! boundary; anything else mid-structure is a corrupt stream.

use crate::dbf::types::{DbfRow, DbfSchema, FieldDescriptor, FieldType, FieldValue};
use crate::error::{DbfError, DbfResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::{self, Read};
use std::sync::Arc;

/// Fixed part of the table header, before the field descriptors.
const TABLE_HEADER_LEN: usize = 32;

/// Size of one field descriptor entry.
const FIELD_DESCRIPTOR_LEN: usize = 32;

/// Terminator byte after the last field descriptor.
const HEADER_TERMINATOR: u8 = 0x0D;

/// End-of-file marker after the last record.
const EOF_MARKER: u8 = 0x1A;

/// Deletion flag value marking a record as logically removed.
const DELETED_FLAG: u8 = 0x2A;

/// Streaming reader over a raw DBF byte stream.
pub struct DbfReader<R: Read> {
    input: R,
    schema: Arc<DbfSchema>,
    record_count: u32,
    record_len: usize,
    buf: Vec<u8>,
}

impl<R: Read> DbfReader<R> {
    /// Parse the header from `input` and return a reader positioned at the
    /// first record. `schema_name` overrides the default root name.
    pub fn new(mut input: R, schema_name: Option<&str>) -> DbfResult<Self> {
        let mut header = [0u8; TABLE_HEADER_LEN];
        input.read_exact(&mut header).map_err(at_eof_corrupt)?;

        let record_count = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let header_len = u16::from_le_bytes([header[8], header[9]]) as usize;
        let record_len = u16::from_le_bytes([header[10], header[11]]) as usize;

        if header_len < TABLE_HEADER_LEN + FIELD_DESCRIPTOR_LEN + 1 {
            return Err(DbfError::Corrupt {
                reason: format!("header length {header_len} leaves no room for fields"),
            });
        }
        if record_len < 2 {
            return Err(DbfError::Corrupt {
                reason: format!("record length {record_len} is too small"),
            });
        }

        let mut fields = Vec::new();
        let mut consumed = TABLE_HEADER_LEN;
        loop {
            let mut first = [0u8; 1];
            input.read_exact(&mut first).map_err(at_eof_corrupt)?;
            consumed += 1;
            if first[0] == HEADER_TERMINATOR {
                break;
            }

            let mut descriptor = [0u8; FIELD_DESCRIPTOR_LEN];
            descriptor[0] = first[0];
            input
                .read_exact(&mut descriptor[1..])
                .map_err(at_eof_corrupt)?;
            consumed += FIELD_DESCRIPTOR_LEN - 1;

            fields.push(parse_descriptor(&descriptor)?);

            if consumed > header_len || fields.len() > MAX_FIELDS {
                return Err(DbfError::Corrupt {
                    reason: "field descriptors overrun the declared header length".into(),
                });
            }
        }

        if fields.is_empty() {
            return Err(DbfError::Corrupt {
                reason: "table declares no fields".into(),
            });
        }

        let data_len: usize = fields.iter().map(|f| f.length as usize).sum();
        if data_len + 1 != record_len {
            return Err(DbfError::Corrupt {
                reason: format!(
                    "field widths sum to {data_len} but record length is {record_len}"
                ),
            });
        }

        // Some writers pad the header past the terminator; skip to the
        // declared start of the record section.
        if consumed < header_len {
            let padding = (header_len - consumed) as u64;
            io::copy(&mut input.by_ref().take(padding), &mut io::sink())?;
        }

        Ok(Self {
            input,
            schema: Arc::new(DbfSchema::new(schema_name, fields)),
            record_count,
            record_len,
            buf: vec![0u8; record_len - 1],
        })
    }

    /// The schema parsed from the header.
    pub fn schema(&self) -> &Arc<DbfSchema> {
        &self.schema
    }

    /// Record count declared by the header (active plus deleted).
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Decode the next active record, or `Ok(None)` at end of data.
    ///
    /// Deleted records are skipped. A stream ending inside a record is a
    /// corrupt stream, not end of data.
    pub fn next_row(&mut self) -> DbfResult<Option<DbfRow>> {
        loop {
            let flag = match self.read_flag()? {
                None => return Ok(None),
                Some(EOF_MARKER) => return Ok(None),
                Some(flag) => flag,
            };

            let body_len = self.record_len - 1;
            self.input
                .read_exact(&mut self.buf[..body_len])
                .map_err(|e| {
                    if e.kind() == io::ErrorKind::UnexpectedEof {
                        DbfError::Corrupt {
                            reason: "stream ends inside a record".into(),
                        }
                    } else {
                        DbfError::Io(e)
                    }
                })?;

            if flag == DELETED_FLAG {
                continue;
            }

            let mut values = Vec::with_capacity(self.schema.fields.len());
            let mut offset = 0usize;
            for field in &self.schema.fields {
                let slot = &self.buf[offset..offset + field.length as usize];
                values.push(parse_value(field, slot)?);
                offset += field.length as usize;
            }

            return Ok(Some(DbfRow::new(Arc::clone(&self.schema), values)));
        }
    }

    /// Read the next record's deletion flag; `None` on a clean end of file.
    fn read_flag(&mut self) -> DbfResult<Option<u8>> {
        let mut flag = [0u8; 1];
        loop {
            match self.input.read(&mut flag) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(flag[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DbfError::Io(e)),
            }
        }
    }
}

/// Upper bound on fields per table; a schema larger than this is garbage.
const MAX_FIELDS: usize = 1024;

fn at_eof_corrupt(e: io::Error) -> DbfError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DbfError::Corrupt {
            reason: "stream ends inside the table header".into(),
        }
    } else {
        DbfError::Io(e)
    }
}

/// Decode a single-byte-per-character (Latin-1) byte slice.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn parse_descriptor(descriptor: &[u8; FIELD_DESCRIPTOR_LEN]) -> DbfResult<FieldDescriptor> {
    let name_bytes = descriptor[..11]
        .split(|&b| b == 0)
        .next()
        .unwrap_or(&descriptor[..11]);
    let name = latin1(name_bytes).trim().to_string();
    let field_type = FieldType::from_code(descriptor[11]);
    let length = descriptor[16];
    let decimal_count = descriptor[17];

    FieldDescriptor::new(name, field_type, length, decimal_count)
}

fn parse_value(field: &FieldDescriptor, slot: &[u8]) -> DbfResult<FieldValue> {
    match field.field_type {
        FieldType::Character => Ok(FieldValue::Character(
            // Character slots are space- or NUL-padded
            latin1(slot)
                .trim_matches(|c: char| c.is_whitespace() || c == '\0')
                .to_string(),
        )),
        FieldType::Date => parse_date(field, slot),
        FieldType::Numeric => parse_numeric(field, slot),
        FieldType::Float => parse_float(field, slot),
        FieldType::Logical => parse_logical(field, slot),
        FieldType::Memo | FieldType::Unknown(_) => Err(DbfError::CorruptField {
            field: field.name.clone(),
            reason: format!("cannot decode {} field data", field.field_type),
        }),
    }
}

fn parse_date(field: &FieldDescriptor, slot: &[u8]) -> DbfResult<FieldValue> {
    let raw = latin1(slot);
    let text = raw.trim();
    if text.is_empty() {
        return Err(corrupt_field(field, "blank date value"));
    }
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(corrupt_field(field, &format!("expected YYYYMMDD, got '{text}'")));
    }

    let year: i32 = text[..4].parse().map_err(|_| corrupt_field(field, text))?;
    let month: u32 = text[4..6].parse().map_err(|_| corrupt_field(field, text))?;
    let day: u32 = text[6..8].parse().map_err(|_| corrupt_field(field, text))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .map(FieldValue::Date)
        .ok_or_else(|| corrupt_field(field, &format!("invalid calendar date '{text}'")))
}

fn parse_numeric(field: &FieldDescriptor, slot: &[u8]) -> DbfResult<FieldValue> {
    let raw = latin1(slot);
    let mut text = raw.trim();
    if text.is_empty() {
        return Err(corrupt_field(field, "blank numeric value"));
    }
    text = text.strip_prefix('+').unwrap_or(text);
    text = text.strip_suffix('.').unwrap_or(text);

    let mut value: Decimal = text
        .parse()
        .map_err(|_| corrupt_field(field, &format!("invalid numeric value '{text}'")))?;
    // The declared decimal count is the field's scale; the text may carry
    // fewer digits (e.g. "42" in a count-2 field means 42.00).
    value.rescale(field.decimal_count as u32);
    Ok(FieldValue::Numeric(value))
}

fn parse_float(field: &FieldDescriptor, slot: &[u8]) -> DbfResult<FieldValue> {
    let raw = latin1(slot);
    let text = raw.trim();
    if text.is_empty() {
        return Err(corrupt_field(field, "blank float value"));
    }
    text.parse::<f32>()
        .map(FieldValue::Float)
        .map_err(|_| corrupt_field(field, &format!("invalid float value '{text}'")))
}

fn parse_logical(field: &FieldDescriptor, slot: &[u8]) -> DbfResult<FieldValue> {
    let raw = latin1(slot);
    match raw.trim() {
        "T" | "t" | "Y" | "y" => Ok(FieldValue::Logical(true)),
        "F" | "f" | "N" | "n" => Ok(FieldValue::Logical(false)),
        "" => Err(corrupt_field(field, "blank logical value")),
        other => Err(corrupt_field(field, &format!("invalid logical value '{other}'"))),
    }
}

fn corrupt_field(field: &FieldDescriptor, reason: &str) -> DbfError {
    DbfError::CorruptField {
        field: field.name.clone(),
        reason: reason.to_string(),
    }
}
