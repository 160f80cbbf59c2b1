//! Configuration types.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::redact_connection_string;
use crate::transfer::PAGE_SIZE;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (ODBC).
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Clone behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// ODBC connection string, e.g.
    /// `Driver={Advantage StreamlineSQL ODBC};DataDirectory=\\srv\data;ServerTypes=2`.
    pub connection_string: String,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field(
                "connection_string",
                &redact_connection_string(&self.connection_string),
            )
            .finish()
    }
}

/// Target database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// libpq key/value string, `postgres://` URL, or `Host=..;Username=..;` string.
    pub connection_string: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field(
                "connection_string",
                &redact_connection_string(&self.connection_string),
            )
            .finish()
    }
}

/// Clone behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source tables to clone, in order.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Rows per page (default: 1000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,

    /// Create source indexes on newly created tables (default: true).
    #[serde(default = "default_true")]
    pub create_indexes: bool,

    /// Verbose logging. Accepts a boolean or the string `"true"`.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub debug: bool,

    /// Print statements instead of executing them.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub echo: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            page_size: None,
            create_indexes: true,
            debug: false,
            echo: false,
        }
    }
}

impl MigrationConfig {
    /// Get page size, defaulting to 1000 rows.
    pub fn get_page_size(&self) -> usize {
        self.page_size.unwrap_or(PAGE_SIZE)
    }
}

/// Flat `config.json` layout used by earlier releases of the tool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct LegacyConfig {
    source_connection_string: String,
    destination_connection_string: String,
    #[serde(default)]
    table_names: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    debug_mode: bool,
}

impl From<LegacyConfig> for Config {
    fn from(legacy: LegacyConfig) -> Self {
        Config {
            source: SourceConfig {
                connection_string: legacy.source_connection_string,
            },
            target: TargetConfig {
                connection_string: legacy.destination_connection_string,
            },
            migration: MigrationConfig {
                tables: legacy.table_names,
                debug: legacy.debug_mode,
                ..Default::default()
            },
        }
    }
}

fn default_true() -> bool {
    true
}

/// Accept `true`/`false` as well as string spellings such as `"true"` or `"1"`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Text(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        None => false,
    })
}
