//! SQL value types carried from the source page to the destination insert.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::identifier::escape_literal;

/// Type hint for NULL values so the destination parameter gets the right type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    I32,
    String,
    Decimal,
    DateTime,
}

/// A single column value of a fetched row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL with type hint.
    Null(SqlNullType),

    /// Boolean value.
    Bool(bool),

    /// 32-bit signed integer.
    I32(i32),

    /// Text data.
    String(String),

    /// Fixed-point decimal.
    Decimal(Decimal),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Render the value as a PostgreSQL literal.
    ///
    /// Only used for echo output, never for executed statements.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null(_) => "NULL".to_string(),
            SqlValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            SqlValue::I32(n) => n.to_string(),
            SqlValue::String(s) => format!("'{}'", escape_literal(s)),
            SqlValue::Decimal(d) => d.to_string(),
            SqlValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.6f")),
        }
    }
}

/// A fetched page of rows, each row ordered like the table's columns.
pub type Rows = Vec<Vec<SqlValue>>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_literals() {
        assert_eq!(SqlValue::Null(SqlNullType::I32).to_literal(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_literal(), "TRUE");
        assert_eq!(SqlValue::I32(-7).to_literal(), "-7");
        assert_eq!(SqlValue::String("O'Brien".into()).to_literal(), "'O''Brien'");
        assert_eq!(
            SqlValue::Decimal("12.50".parse().unwrap()).to_literal(),
            "12.50"
        );
        let dt = NaiveDate::from_ymd_opt(2023, 12, 25)
            .unwrap()
            .and_hms_opt(10, 30, 45)
            .unwrap();
        assert_eq!(
            SqlValue::DateTime(dt).to_literal(),
            "'2023-12-25 10:30:45.000000'"
        );
    }
}
