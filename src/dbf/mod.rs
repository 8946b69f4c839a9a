//! DBF source format
//!
//! # Module Structure
//!
//! - `types`: field descriptors, schemas and typed row values
//! - `reader`: streaming header/record reader over `io::Read`

pub mod reader;
pub mod types;

pub use reader::DbfReader;
pub use types::{DbfRow, DbfSchema, FieldDescriptor, FieldType, FieldValue};
