//! Identifier sanitizing and quoting.
//!
//! Source tables are addressed by whatever the caller wrote in the
//! configuration (`AISRPTS`, `[DATA\AISRPTS.ADT]`, ...). The destination gets a
//! derived identifier that only contains `[a-z0-9_]`, so it can be used in
//! generated DDL without further escaping. Quoting is still applied on top of
//! it by [`quote_pg`] because a sanitized name may start with a digit.

use crate::error::{CloneError, Result};

/// Maximum identifier length accepted before quoting.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Convert a source table (or column) identifier into a destination identifier.
///
/// Brackets are removed, every character outside `[A-Za-z0-9]` becomes `_`,
/// and the result is lower-cased. The function is total and idempotent.
///
/// ```
/// use ads_pg_clone::core::identifier::sanitize;
///
/// assert_eq!(sanitize("[DATA\\AISRPTS.ADT]"), "data_aisrpts_adt");
/// assert_eq!(sanitize(&sanitize("Cust-No")), sanitize("Cust-No"));
/// ```
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '[' && *c != ']')
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Validate an identifier before it is quoted into SQL.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding [`MAX_IDENTIFIER_LENGTH`].
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CloneError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(CloneError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(CloneError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL identifier.
///
/// Escapes double quotes by doubling them and wraps in double quotes.
pub fn quote_pg(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Escape a SQL string literal value. Doubles single quotes: `O'Brien` -> `O''Brien`
pub fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}
