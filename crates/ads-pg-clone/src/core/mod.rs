//! Core types shared by the source, target and engine modules.
//!
//! - [`schema`]: column, table, index and primary key metadata
//! - [`value`]: typed row values
//! - [`identifier`]: destination identifier sanitizing and quoting

pub mod identifier;
pub mod schema;
pub mod value;

pub use identifier::{quote_pg, sanitize};
pub use schema::{ColumnDefinition, IndexDefinition, PrimaryKeyInfo, SourceType, TableSchema};
pub use value::{Rows, SqlNullType, SqlValue};
