//! Configuration validation.

use super::Config;
use crate::error::{CloneError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.connection_string.trim().is_empty() {
        return Err(CloneError::Config(
            "source.connection_string is required".into(),
        ));
    }
    if config.target.connection_string.trim().is_empty() {
        return Err(CloneError::Config(
            "target.connection_string is required".into(),
        ));
    }

    if config.migration.tables.is_empty() {
        return Err(CloneError::Config(
            "migration.tables must name at least one table".into(),
        ));
    }
    if let Some(pos) = config.migration.tables.iter().position(|t| t.trim().is_empty()) {
        return Err(CloneError::Config(format!(
            "migration.tables[{}] is blank",
            pos
        )));
    }

    if let Some(0) = config.migration.page_size {
        return Err(CloneError::Config(
            "migration.page_size must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MigrationConfig, SourceConfig, TargetConfig};

    fn valid_config() -> Config {
        Config {
            source: SourceConfig {
                connection_string: "DSN=ads".to_string(),
            },
            target: TargetConfig {
                connection_string: "host=localhost user=postgres password=password".to_string(),
            },
            migration: MigrationConfig {
                tables: vec!["AISRPTS".to_string()],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_source_connection() {
        let mut config = valid_config();
        config.source.connection_string = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_target_connection() {
        let mut config = valid_config();
        config.target.connection_string = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_no_tables() {
        let mut config = valid_config();
        config.migration.tables.clear();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("migration.tables"));
    }

    #[test]
    fn test_blank_table_name() {
        let mut config = valid_config();
        config.migration.tables.push(" ".to_string());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("tables[1]"));
    }

    #[test]
    fn test_zero_page_size() {
        let mut config = valid_config();
        config.migration.page_size = Some(0);
        assert!(validate(&config).is_err());
        config.migration.page_size = Some(1);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_target_config_debug_redacts_password() {
        let config = valid_config();
        let debug_output = format!("{:?}", config.target);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("password=password"),
            "Debug output should not contain actual password value"
        );
    }
}
