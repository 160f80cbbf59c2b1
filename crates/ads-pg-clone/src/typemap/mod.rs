//! Type mapping between source columns and PostgreSQL.

use crate::core::SourceType;
use crate::error::{CloneError, Result};

/// Map a source column type to a PostgreSQL type keyword.
///
/// Only the five categories the clone knows how to carry are accepted; any
/// other type is an error and aborts provisioning of the table.
pub fn map_type(source_type: &SourceType) -> std::result::Result<&'static str, String> {
    match source_type {
        SourceType::Int32 => Ok("integer"),
        SourceType::String => Ok("text"),
        SourceType::DateTime => Ok("timestamp"),
        SourceType::Boolean => Ok("boolean"),
        SourceType::Decimal => Ok("decimal"),
        SourceType::Other(name) => Err(name.clone()),
    }
}

/// Map a column of `table`, producing [`CloneError::UnsupportedType`] on failure.
pub fn map_column_type(table: &str, column: &str, source_type: &SourceType) -> Result<&'static str> {
    map_type(source_type).map_err(|source_type| CloneError::UnsupportedType {
        table: table.to_string(),
        column: column.to_string(),
        source_type,
    })
}
