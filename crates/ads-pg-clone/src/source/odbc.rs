//! ODBC source for Advantage Database Server tables.
//!
//! The pool holds a single connection for its whole lifetime, opened from a
//! process-wide ODBC environment. Queries run under a mutex, since ODBC
//! handles are not safe to share across threads. Cells are read one row at a
//! time as UTF-16 text, so neither long memo values nor non-ASCII characters
//! depend on buffer sizes or the client code page. The text is then converted
//! to typed values using the column's [`SourceType`].
//!
//! The queries use Advantage SQL: `SELECT TOP n START AT m` for paging and
//! the `INDEXES` catalog for index keys.

use crate::core::identifier::escape_literal;
use crate::core::{
    ColumnDefinition, IndexDefinition, Rows, SourceType, SqlNullType, SqlValue, TableSchema,
};
use crate::error::{CloneError, Result};
use crate::source::SourcePool;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use odbc_api::{Connection, ConnectionOptions, Cursor, DataType, Environment, ResultSetMetadata};
use rust_decimal::Decimal;
use std::sync::OnceLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

static ODBC_ENV: OnceLock<Environment> = OnceLock::new();

/// Process-wide ODBC environment, created on first use.
fn odbc_environment() -> Result<&'static Environment> {
    if let Some(env) = ODBC_ENV.get() {
        return Ok(env);
    }

    let env = Environment::new().map_err(|e| {
        CloneError::pool(
            format!(
                "Failed to create ODBC environment: {}. \
                 Make sure an ODBC driver manager and the Advantage ODBC driver are installed.",
                e
            ),
            "ODBC connection",
        )
    })?;

    Ok(ODBC_ENV.get_or_init(|| env))
}

/// ODBC-based source pool.
pub struct OdbcSourcePool {
    /// Serializes ODBC operations. `None` once the pool is closed.
    conn: Mutex<Option<Connection<'static>>>,
}

impl OdbcSourcePool {
    /// Open the source connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the ODBC environment cannot be created (driver
    /// manager missing) or the connection fails.
    pub async fn new(connection_string: impl Into<String>) -> Result<Self> {
        let connection_string = connection_string.into();
        let env = odbc_environment()?;

        let conn = env
            .connect_with_connection_string(&connection_string, ConnectionOptions::default())
            .map_err(|e| {
                CloneError::pool(
                    format!("Failed to connect to source via ODBC: {}", e),
                    "ODBC connection",
                )
            })?;

        info!("Connected to source via ODBC");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Run `f` against the open connection while holding the lock.
    async fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection<'static>) -> Result<T>,
    ) -> Result<T> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or_else(|| CloneError::Source("source connection is closed".to_string()))?;
        f(conn)
    }
}

/// Execute a query and return rows as text cells.
fn execute_query(conn: &Connection<'_>, sql: &str) -> Result<Vec<Vec<Option<String>>>> {
    debug!("Source query: {}", sql);

    let mut rows = Vec::new();

    let Some(mut cursor) = conn
        .execute(sql, ())
        .map_err(|e| CloneError::Source(format!("ODBC query failed: {} - SQL: {}", e, sql)))?
    else {
        return Ok(rows);
    };

    let num_cols = cursor
        .num_result_cols()
        .map_err(|e| CloneError::Source(format!("Failed to get column count: {}", e)))?
        .max(0) as u16;

    let mut buf = Vec::new();
    while let Some(mut row) = cursor
        .next_row()
        .map_err(|e| CloneError::Source(format!("Failed to fetch rows: {}", e)))?
    {
        let mut values = Vec::with_capacity(num_cols as usize);
        for col in 1..=num_cols {
            let present = row.get_wide_text(col, &mut buf).map_err(|e| {
                CloneError::Source(format!("Failed to read column {}: {} - SQL: {}", col, e, sql))
            })?;
            values.push(present.then(|| decode_wide(&buf)));
        }
        rows.push(values);
    }

    Ok(rows)
}

fn probe_columns_sync(conn: &Connection<'_>, table: &str) -> Result<TableSchema> {
    let sql = format!("SELECT TOP 1 * FROM {}", table);
    debug!("Source query: {}", sql);

    let mut cursor = conn
        .execute(&sql, ())
        .map_err(|e| CloneError::Source(format!("Schema probe failed: {} - SQL: {}", e, sql)))?
        .ok_or_else(|| CloneError::Source(format!("Schema probe returned no result set: {}", sql)))?;

    let num_cols = cursor
        .num_result_cols()
        .map_err(|e| CloneError::Source(format!("Failed to get column count: {}", e)))?;

    let mut columns = Vec::with_capacity(num_cols.max(0) as usize);
    for col in 1..=num_cols.max(0) as u16 {
        let name = cursor
            .col_name(col)
            .map_err(|e| CloneError::Source(format!("Failed to read column name: {}", e)))?;
        let data_type = cursor
            .col_data_type(col)
            .map_err(|e| CloneError::Source(format!("Failed to read column type: {}", e)))?;
        columns.push(ColumnDefinition::new(name, odbc_source_type(&data_type)));
    }

    Ok(TableSchema {
        source_table_name: table.to_string(),
        columns,
    })
}

#[async_trait]
impl SourcePool for OdbcSourcePool {
    async fn probe_columns(&self, table: &str) -> Result<TableSchema> {
        self.with_connection(|conn| probe_columns_sync(conn, table))
            .await
    }

    async fn load_indexes(&self, table: &str) -> Result<Vec<IndexDefinition>> {
        let sql = format!(
            "SELECT trim(INDEX_NAME), trim([KEY]) FROM INDEXES \
             WHERE TABLE_NAME = '{}' AND trim([KEY]) <> '' AND trim(INDEX_NAME) <> ''",
            escape_literal(table)
        );

        let rows = self.with_connection(|conn| execute_query(conn, &sql)).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let name = row.first().cloned().flatten()?.trim().to_string();
                let key = row.get(1).cloned().flatten()?.trim().to_string();
                (!name.is_empty() && !key.is_empty()).then(|| IndexDefinition::new(name, key))
            })
            .collect())
    }

    async fn get_row_count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let rows = self.with_connection(|conn| execute_query(conn, &sql)).await?;

        let text = rows
            .first()
            .and_then(|r| r.first())
            .and_then(|v| v.as_deref())
            .ok_or_else(|| CloneError::Source(format!("Row count returned no value: {}", sql)))?;

        text.trim()
            .parse()
            .map_err(|e| CloneError::Source(format!("Invalid row count {:?}: {}", text, e)))
    }

    async fn fetch_page(
        &self,
        schema: &TableSchema,
        page_size: usize,
        start_row: usize,
    ) -> Result<Rows> {
        let sql = page_query(&schema.source_table_name, page_size, start_row);
        let col_types = schema.column_types();

        let rows = self.with_connection(|conn| execute_query(conn, &sql)).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .enumerate()
                    .map(|(idx, text)| {
                        let source_type = col_types.get(idx).unwrap_or(&SourceType::String);
                        convert_text_to_sqlvalue(text, source_type)
                    })
                    .collect()
            })
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("SELECT 1 FROM system.iota", ())
                .map_err(|e| CloneError::Source(format!("Source health check failed: {}", e)))?;
            Ok(())
        })
        .await
    }

    fn db_type(&self) -> &str {
        "ads"
    }

    async fn close(&self) {
        if self.conn.lock().await.take().is_some() {
            info!("Closed source connection");
        }
    }
}

/// Decode a UTF-16 cell; unpaired surrogates become U+FFFD.
fn decode_wide(buf: &[u16]) -> String {
    String::from_utf16_lossy(buf)
}

/// Advantage paging query for one page.
fn page_query(table: &str, page_size: usize, start_row: usize) -> String {
    format!(
        "SELECT TOP {} START AT {} * FROM {}",
        page_size, start_row, table
    )
}

/// Classify an ODBC column type into a [`SourceType`].
fn odbc_source_type(data_type: &DataType) -> SourceType {
    match data_type {
        DataType::Integer => SourceType::Int32,
        DataType::Char { .. }
        | DataType::WChar { .. }
        | DataType::Varchar { .. }
        | DataType::WVarchar { .. }
        | DataType::LongVarchar { .. }
        | DataType::Other {
            data_type: odbc_api::sys::SqlDataType::EXT_W_LONG_VARCHAR,
            ..
        } => SourceType::String,
        DataType::Date | DataType::Timestamp { .. } => SourceType::DateTime,
        DataType::Bit => SourceType::Boolean,
        DataType::Decimal { .. } | DataType::Numeric { .. } => SourceType::Decimal,
        other => SourceType::Other(format!("{:?}", other)),
    }
}

/// Convert an ODBC text cell to a typed value.
///
/// SQL NULL and text that does not parse as the column's type both become a
/// typed NULL.
fn convert_text_to_sqlvalue(text: Option<String>, source_type: &SourceType) -> SqlValue {
    let Some(s) = text else {
        return SqlValue::Null(source_type.null_type());
    };

    match source_type {
        SourceType::Int32 => s
            .trim()
            .parse::<i32>()
            .map(SqlValue::I32)
            .unwrap_or(SqlValue::Null(SqlNullType::I32)),
        SourceType::Boolean => match s.trim() {
            "1" | "true" | "True" | "TRUE" | "T" | "t" => SqlValue::Bool(true),
            "0" | "false" | "False" | "FALSE" | "F" | "f" => SqlValue::Bool(false),
            _ => SqlValue::Null(SqlNullType::Bool),
        },
        SourceType::Decimal => s
            .trim()
            .parse::<Decimal>()
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),
        SourceType::DateTime => parse_datetime(s.trim())
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),
        SourceType::String | SourceType::Other(_) => SqlValue::String(s),
    }
}

/// Parse ODBC timestamp text; date-only values become midnight.
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
