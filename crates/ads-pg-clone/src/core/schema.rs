//! Table, column, index and primary key metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::SqlNullType;

/// Native type category of a source column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// 32-bit integer.
    Int32,
    /// Character data of any width.
    String,
    /// Date or timestamp.
    DateTime,
    /// Logical / bit.
    Boolean,
    /// Decimal or numeric fixed-point.
    Decimal,
    /// Anything the clone cannot map; carries the driver's type name.
    Other(String),
}

impl SourceType {
    /// NULL type hint for values of this column.
    pub fn null_type(&self) -> SqlNullType {
        match self {
            SourceType::Int32 => SqlNullType::I32,
            SourceType::DateTime => SqlNullType::DateTime,
            SourceType::Boolean => SqlNullType::Bool,
            SourceType::Decimal => SqlNullType::Decimal,
            SourceType::String | SourceType::Other(_) => SqlNullType::String,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Int32 => write!(f, "int32"),
            SourceType::String => write!(f, "string"),
            SourceType::DateTime => write!(f, "datetime"),
            SourceType::Boolean => write!(f, "bool"),
            SourceType::Decimal => write!(f, "decimal"),
            SourceType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Column metadata read by the schema probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name as reported by the source.
    pub name: String,

    /// Native type category.
    pub source_type: SourceType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
        }
    }
}

/// Column layout of one source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name as used in source queries.
    pub source_table_name: String,

    /// Columns in source order.
    pub columns: Vec<ColumnDefinition>,
}

impl TableSchema {
    /// Column names in source order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Column source types in source order.
    pub fn column_types(&self) -> Vec<SourceType> {
        self.columns.iter().map(|c| c.source_type.clone()).collect()
    }
}

/// Index declared on a source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,

    /// Source-dialect key expression, e.g. `REPORT+upper(NAME)`.
    pub raw_key_expression: String,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, raw_key_expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_key_expression: raw_key_expression.into(),
        }
    }
}

/// Primary key of a destination table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyInfo {
    pub has_primary_key: bool,

    /// Participating destination columns, in key order.
    pub columns: Vec<String>,
}

impl PrimaryKeyInfo {
    /// A table without a primary key.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            has_primary_key: !columns.is_empty(),
            columns,
        }
    }
}
