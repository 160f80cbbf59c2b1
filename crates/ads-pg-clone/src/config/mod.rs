//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

const REDACTED: &str = "[REDACTED]";

static PASSWORD_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(password|pwd)\s*=\s*('[^']*'|[^;\s]*)").expect("valid password pattern")
});

static URI_CREDENTIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-z][a-z0-9+.-]*://[^:@/\s]+:)([^@/\s]+)(@)").expect("valid uri pattern")
});

impl Config {
    /// Load configuration from a file.
    ///
    /// `.yaml` / `.yml` files are read as YAML, anything else as JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::from_yaml(&content)
            }
            _ => Self::from_json(&content),
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    ///
    /// Both the nested layout and the flat `SourceConnectionString` /
    /// `DestinationConnectionString` / `TableNames` / `DebugMode` layout are accepted.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let config: Config = if value.get("SourceConnectionString").is_some() {
            serde_json::from_value::<LegacyConfig>(value)?.into()
        } else {
            serde_json::from_value(value)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

/// Replace password values in a connection string with `[REDACTED]`.
///
/// Handles `Password=`/`PWD=` pairs in ODBC, ADO.NET and libpq strings, and
/// `user:password@` credentials in URLs.
pub fn redact_connection_string(input: &str) -> String {
    let redacted_pairs = PASSWORD_PAIR.replace_all(input, |caps: &Captures| {
        format!("{}={}", &caps[1], REDACTED)
    });
    URI_CREDENTIAL
        .replace_all(&redacted_pairs, |caps: &Captures| {
            format!("{}{}{}", &caps[1], REDACTED, &caps[3])
        })
        .to_string()
}
