//! Error types for the clone library.

use thiserror::Error;

/// Main error type for clone operations.
#[derive(Error, Debug)]
pub enum CloneError {
    /// Configuration error (invalid JSON/YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error (connectivity, permissions, encryption)
    #[error("Source database error: {0}")]
    Source(String),

    /// Destination database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A single destination statement failed
    #[error("Statement failed: {message}\n  SQL: {sql}")]
    Statement { sql: String, message: String },

    /// A source column type has no destination mapping
    #[error("Table {table}: column {column} has unsupported type {source_type}")]
    UnsupportedType {
        table: String,
        column: String,
        source_type: String,
    },

    /// A CREATE INDEX statement failed
    #[error("Index {index} could not be created: {message}")]
    IndexCreation { index: String, message: String },

    /// Writing a page to the destination failed; the page was rolled back
    #[error("Page {page} of table {table} failed: {message}")]
    PageWrite {
        table: String,
        page: usize,
        message: String,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<odbc_api::Error> for CloneError {
    fn from(e: odbc_api::Error) -> Self {
        CloneError::Source(e.to_string())
    }
}

impl CloneError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl Into<String>, context: impl Into<String>) -> Self {
        CloneError::Pool {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Statement error
    pub fn statement(sql: impl Into<String>, message: impl ToString) -> Self {
        CloneError::Statement {
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    /// Create a PageWrite error
    pub fn page_write(table: impl Into<String>, page: usize, message: impl ToString) -> Self {
        CloneError::PageWrite {
            table: table.into(),
            page,
            message: message.to_string(),
        }
    }

    /// Re-label an error raised while reading the source as `Source`.
    ///
    /// Connection and pool failures on the source side would otherwise be
    /// reported with the target's exit code.
    pub fn into_source(self) -> Self {
        match self {
            CloneError::Source(_) => self,
            other => CloneError::Source(other.to_string()),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CloneError::Config(_) | CloneError::Json(_) | CloneError::Yaml(_) => 1,
            CloneError::Source(_) => 2,
            CloneError::Target(_) | CloneError::Pool { .. } | CloneError::Statement { .. } => 3,
            CloneError::PageWrite { .. } => 4,
            CloneError::UnsupportedType { .. } | CloneError::IndexCreation { .. } => 5,
            CloneError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for clone operations.
pub type Result<T> = std::result::Result<T, CloneError>;
