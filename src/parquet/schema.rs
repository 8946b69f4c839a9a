//! DBF to Parquet schema mapping
//!
//! Single source of truth for the type mapping:
//!
//! | DBF type       | physical   | logical                              |
//! |----------------|------------|--------------------------------------|
//! | Character      | BYTE_ARRAY | String                               |
//! | Date           | INT32      | Date                                 |
//! | Numeric        | BYTE_ARRAY | Decimal(precision=length, scale=dec) |
//! | FloatingPoint  | FLOAT      | —                                    |
//! | Logical        | BOOLEAN    | —                                    |
//!
//! Every target field is REQUIRED and carries a field id equal to its
//! zero-based declaration position, so column identity survives renames in
//! downstream metadata. Mapping is fatal-on-unknown: a memo or other
//! unmapped type fails the whole schema and no fields are produced.

use crate::dbf::{DbfSchema, FieldDescriptor, FieldType};
use crate::error::SchemaError;
use parquet::basic::{LogicalType, Repetition, Type as PhysicalType};
use parquet::schema::types::{Type, TypePtr};
use std::sync::Arc;

/// Map one DBF field to its Parquet primitive type.
///
/// `id` is the field's declaration position within its schema; it is
/// assigned by position, not name, so two schemas with the same fields in a
/// different order map to different id assignments.
pub fn target_field(field: &FieldDescriptor, id: usize) -> Result<Type, SchemaError> {
    let builder = match field.field_type {
        FieldType::Character => {
            Type::primitive_type_builder(&field.name, PhysicalType::BYTE_ARRAY)
                .with_logical_type(Some(LogicalType::String))
        }
        FieldType::Date => Type::primitive_type_builder(&field.name, PhysicalType::INT32)
            .with_logical_type(Some(LogicalType::Date)),
        FieldType::Numeric => {
            Type::primitive_type_builder(&field.name, PhysicalType::BYTE_ARRAY)
                .with_logical_type(Some(LogicalType::Decimal {
                    scale: field.decimal_count as i32,
                    precision: field.length as i32,
                }))
                .with_precision(field.length as i32)
                .with_scale(field.decimal_count as i32)
        }
        FieldType::Float => Type::primitive_type_builder(&field.name, PhysicalType::FLOAT),
        FieldType::Logical => Type::primitive_type_builder(&field.name, PhysicalType::BOOLEAN),
        unsupported => {
            return Err(SchemaError::UnsupportedFieldType {
                field: field.name.clone(),
                kind: unsupported.to_string(),
            })
        }
    };

    builder
        .with_repetition(Repetition::REQUIRED)
        .with_id(Some(id as i32))
        .build()
        .map_err(|source| SchemaError::InvalidMapping {
            field: field.name.clone(),
            source,
        })
}

/// Map a whole DBF schema to the Parquet message type.
///
/// Fails without producing a partial schema if any field is unmapped.
pub fn target_schema(schema: &DbfSchema) -> Result<TypePtr, SchemaError> {
    let mut fields = Vec::with_capacity(schema.fields.len());
    for (id, field) in schema.fields.iter().enumerate() {
        fields.push(Arc::new(target_field(field, id)?));
    }

    Type::group_type_builder(&schema.name)
        .with_fields(fields)
        .build()
        .map(Arc::new)
        .map_err(|source| SchemaError::InvalidMapping {
            field: schema.name.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, field_type: FieldType, length: u8, decimals: u8) -> FieldDescriptor {
        FieldDescriptor::new(name.into(), field_type, length, decimals).unwrap()
    }

    fn five_type_schema() -> DbfSchema {
        DbfSchema::new(
            Some("testTypes"),
            vec![
                descriptor("CHARACTER", FieldType::Character, 10, 0),
                descriptor("DATE", FieldType::Date, 8, 0),
                descriptor("NUMERIC", FieldType::Numeric, 12, 2),
                descriptor("FLOAT", FieldType::Float, 10, 0),
                descriptor("LOGICAL", FieldType::Logical, 1, 0),
            ],
        )
    }

    #[test]
    fn test_mapping_table() {
        let target = target_schema(&five_type_schema()).unwrap();
        assert_eq!(target.name(), "testTypes");

        let fields = target.get_fields();
        assert_eq!(fields.len(), 5);

        assert_eq!(fields[0].get_physical_type(), PhysicalType::BYTE_ARRAY);
        assert_eq!(
            fields[0].get_basic_info().logical_type(),
            Some(LogicalType::String)
        );

        assert_eq!(fields[1].get_physical_type(), PhysicalType::INT32);
        assert_eq!(
            fields[1].get_basic_info().logical_type(),
            Some(LogicalType::Date)
        );

        assert_eq!(fields[2].get_physical_type(), PhysicalType::BYTE_ARRAY);
        assert_eq!(
            fields[2].get_basic_info().logical_type(),
            Some(LogicalType::Decimal {
                scale: 2,
                precision: 12
            })
        );

        assert_eq!(fields[3].get_physical_type(), PhysicalType::FLOAT);
        assert_eq!(fields[3].get_basic_info().logical_type(), None);

        assert_eq!(fields[4].get_physical_type(), PhysicalType::BOOLEAN);
        assert_eq!(fields[4].get_basic_info().logical_type(), None);
    }

    #[test]
    fn test_fields_are_required_with_positional_ids() {
        let target = target_schema(&five_type_schema()).unwrap();
        for (id, field) in target.get_fields().iter().enumerate() {
            let info = field.get_basic_info();
            assert_eq!(info.repetition(), Repetition::REQUIRED);
            assert!(info.has_id());
            assert_eq!(info.id(), id as i32);
        }
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let schema = five_type_schema();
        let a = target_schema(&schema).unwrap();
        let b = target_schema(&schema).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_id_assignment_follows_declaration_order() {
        let reversed = DbfSchema::new(
            Some("reversed"),
            five_type_schema().fields.into_iter().rev().collect(),
        );
        let target = target_schema(&reversed).unwrap();

        // Same field set, different order: LOGICAL now gets id 0
        let first = &target.get_fields()[0];
        assert_eq!(first.name(), "LOGICAL");
        assert_eq!(first.get_basic_info().id(), 0);
    }

    #[test]
    fn test_unsupported_type_fails_whole_schema() {
        let schema = DbfSchema::new(
            None,
            vec![
                descriptor("UF", FieldType::Character, 2, 0),
                descriptor("NOTES", FieldType::Memo, 10, 0),
            ],
        );

        let err = target_schema(&schema).unwrap_err();
        match err {
            SchemaError::UnsupportedFieldType { field, kind } => {
                assert_eq!(field, "NOTES");
                assert_eq!(kind, "MEMO");
            }
            other => panic!("expected UnsupportedFieldType, got {other:?}"),
        }
    }
}
