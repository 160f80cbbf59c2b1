//! Source database operations.

mod odbc;

pub use odbc::OdbcSourcePool;

use crate::core::{IndexDefinition, Rows, TableSchema};
use crate::error::Result;
use async_trait::async_trait;

/// Trait for source database operations.
///
/// Table names are passed through exactly as configured (after upper-casing),
/// so bracketed or path-qualified names reach the source untouched.
#[async_trait]
pub trait SourcePool: Send + Sync {
    /// Read the column layout of a table with a single-row probe.
    async fn probe_columns(&self, table: &str) -> Result<TableSchema>;

    /// Read the index catalog entries of a table.
    ///
    /// Entries with an empty name or an empty key are not returned.
    async fn load_indexes(&self, table: &str) -> Result<Vec<IndexDefinition>>;

    /// Get the row count for a table.
    async fn get_row_count(&self, table: &str) -> Result<i64>;

    /// Fetch up to `page_size` rows starting at the 1-based `start_row`,
    /// in the source's native order, converted by the schema's column types.
    async fn fetch_page(&self, schema: &TableSchema, page_size: usize, start_row: usize)
        -> Result<Rows>;

    /// Run a trivial query to check connectivity.
    async fn ping(&self) -> Result<()>;

    /// Get the database type.
    fn db_type(&self) -> &str;

    /// Close all connections.
    async fn close(&self);
}
