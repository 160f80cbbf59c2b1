//! PostgreSQL statement generators.
//!
//! Each statement kind the clone issues is produced by one pure function so
//! the exact SQL text can be checked without a database.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::core::identifier::{quote_pg, sanitize};
use crate::core::{IndexDefinition, PrimaryKeyInfo, SqlValue, TableSchema};
use crate::error::Result;
use crate::typemap::map_column_type;

use super::keyexpr::translate_key;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("valid placeholder pattern"));

/// `CREATE TABLE IF NOT EXISTS` for a source schema.
///
/// Column names are sanitized the same way as table names. Fails with
/// `UnsupportedType` on the first column the type mapper rejects.
pub fn create_table_sql(dest_table: &str, schema: &TableSchema) -> Result<String> {
    let mut column_defs = Vec::with_capacity(schema.columns.len());
    for col in &schema.columns {
        let pg_type = map_column_type(&schema.source_table_name, &col.name, &col.source_type)?;
        column_defs.push(format!("{} {}", quote_pg(&sanitize(&col.name))?, pg_type));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_pg(dest_table)?,
        column_defs.join(", ")
    ))
}

/// `CREATE INDEX` for one source index, with the key translated.
///
/// The destination index is named `<sanitized name>_idx`.
pub fn create_index_sql(dest_table: &str, index: &IndexDefinition) -> Result<String> {
    Ok(format!(
        "CREATE INDEX {} ON {} ({})",
        quote_pg(&format!("{}_idx", sanitize(&index.name)))?,
        quote_pg(dest_table)?,
        translate_key(&index.raw_key_expression)
    ))
}

pub fn truncate_sql(dest_table: &str) -> Result<String> {
    Ok(format!("TRUNCATE TABLE {}", quote_pg(dest_table)?))
}

/// Parameterized row insert.
///
/// Without a primary key this is a plain `INSERT`. With one, conflicts on the
/// key update every non-key column; a table whose columns are all part of the
/// key gets `DO NOTHING`.
pub fn insert_sql(dest_table: &str, columns: &[String], pk: &PrimaryKeyInfo) -> Result<String> {
    let quoted_cols = columns
        .iter()
        .map(|c| quote_pg(c))
        .collect::<Result<Vec<_>>>()?;
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_pg(dest_table)?,
        quoted_cols.join(", "),
        placeholders.join(", ")
    );

    if !pk.has_primary_key {
        return Ok(sql);
    }

    let conflict_cols = pk
        .columns
        .iter()
        .map(|c| quote_pg(c))
        .collect::<Result<Vec<_>>>()?;

    let update_cols: Vec<String> = columns
        .iter()
        .filter(|c| !pk.columns.contains(c))
        .map(|c| quote_pg(c).map(|q| format!("{} = EXCLUDED.{}", q, q)))
        .collect::<Result<Vec<_>>>()?;

    if update_cols.is_empty() {
        sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", conflict_cols.join(", ")));
    } else {
        sql.push_str(&format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            conflict_cols.join(", "),
            update_cols.join(", ")
        ));
    }

    Ok(sql)
}

/// Inline a row's values into a `$n` parameterized statement.
///
/// Substitution is a single pass, so a value containing `$2` is not rewritten
/// again. Placeholders without a matching value are left as-is.
pub fn render_statement(sql: &str, row: &[SqlValue]) -> String {
    PLACEHOLDER
        .replace_all(sql, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| row.get(i))
                .map(|v| v.to_literal())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
