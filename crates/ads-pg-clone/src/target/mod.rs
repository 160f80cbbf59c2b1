//! PostgreSQL target database operations.

mod executor;

pub use executor::Executor;

use crate::core::{SqlNullType, SqlValue};
use crate::error::{CloneError, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{types::ToSql, Config as PgConfig, NoTls};
use tracing::{debug, info};

/// Trait for target database operations.
///
/// Catalog lookups are scoped to the connection's current schema.
#[async_trait]
pub trait TargetPool: Send + Sync {
    /// Check if a table exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Execute a single statement, returning the affected row count.
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Name of the table's `PRIMARY KEY` constraint, if it has one.
    async fn primary_key_constraint(&self, table: &str) -> Result<Option<String>>;

    /// Columns participating in a constraint, in key order.
    async fn constraint_columns(&self, table: &str, constraint: &str) -> Result<Vec<String>>;

    /// Run one parameterized statement per row inside a single transaction.
    ///
    /// Either every row is applied or, on the first failure, none is.
    async fn write_page(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64>;

    /// Run a trivial query to check connectivity.
    async fn ping(&self) -> Result<()>;

    /// Get the database type.
    fn db_type(&self) -> &str;

    /// Close all connections.
    async fn close(&self);
}

/// PostgreSQL target pool.
///
/// Holds a single connection so one run owns exactly one destination session.
pub struct PgPool {
    pool: Pool,
}

impl PgPool {
    /// Connect to PostgreSQL and verify the connection.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pg_config = pg_config_from_connection_string(connection_string)?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = Manager::from_config(pg_config.clone(), NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(1)
            .build()
            .map_err(|e| CloneError::pool(format!("Failed to create pool: {}", e), "creating PostgreSQL pool"))?;

        let client = pool
            .get()
            .await
            .map_err(|e| CloneError::pool(format!("Failed to get connection: {}", e), "connecting to PostgreSQL"))?;

        client.simple_query("SELECT 1").await?;
        drop(client);

        info!(
            "Connected to PostgreSQL: {}/{}",
            describe_hosts(&pg_config),
            pg_config.get_dbname().unwrap_or("")
        );

        Ok(Self { pool })
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| CloneError::pool(e.to_string(), "getting PostgreSQL connection"))
    }
}

#[async_trait]
impl TargetPool for PgPool {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let client = self.client().await?;

        let row = client
            .query_one(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.tables
                    WHERE table_schema = current_schema() AND table_name = $1
                )",
                &[&table],
            )
            .await?;

        Ok(row.get(0))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let client = self.client().await?;
        client
            .execute(sql, &[])
            .await
            .map_err(|e| CloneError::statement(sql, e))
    }

    async fn primary_key_constraint(&self, table: &str) -> Result<Option<String>> {
        let client = self.client().await?;

        let row = client
            .query_opt(
                "SELECT constraint_name::text
                 FROM information_schema.table_constraints
                 WHERE constraint_type = 'PRIMARY KEY'
                   AND table_schema = current_schema()
                   AND table_name = $1",
                &[&table],
            )
            .await?;

        Ok(row.map(|r| r.get(0)))
    }

    async fn constraint_columns(&self, table: &str, constraint: &str) -> Result<Vec<String>> {
        let client = self.client().await?;

        let rows = client
            .query(
                "SELECT column_name::text
                 FROM information_schema.key_column_usage
                 WHERE table_schema = current_schema()
                   AND table_name = $1
                   AND constraint_name = $2
                 ORDER BY ordinal_position",
                &[&table, &constraint],
            )
            .await?;

        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn write_page(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let stmt = tx
            .prepare(sql)
            .await
            .map_err(|e| CloneError::statement(sql, e))?;

        let mut written = 0u64;
        for row in rows {
            let params: Vec<Box<dyn ToSql + Sync + Send>> = row.iter().map(sql_value_to_param).collect();
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();
            written += tx
                .execute(&stmt, &refs)
                .await
                .map_err(|e| CloneError::statement(sql, e))?;
        }

        tx.commit().await?;
        debug!("Committed {} rows", written);
        Ok(written)
    }

    async fn ping(&self) -> Result<()> {
        let client = self.client().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
    }
}

/// Convert a value to a typed parameter; NULLs keep their type so the
/// server sees a matching parameter OID.
fn sql_value_to_param(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null(SqlNullType::Bool) => Box::new(None::<bool>),
        SqlValue::Null(SqlNullType::I32) => Box::new(None::<i32>),
        SqlValue::Null(SqlNullType::String) => Box::new(None::<String>),
        SqlValue::Null(SqlNullType::Decimal) => Box::new(None::<rust_decimal::Decimal>),
        SqlValue::Null(SqlNullType::DateTime) => Box::new(None::<chrono::NaiveDateTime>),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::I32(n) => Box::new(*n),
        SqlValue::String(s) => Box::new(s.clone()),
        SqlValue::Decimal(d) => Box::new(*d),
        SqlValue::DateTime(dt) => Box::new(*dt),
    }
}

/// Build a `tokio_postgres::Config` from a destination connection string.
///
/// Accepts libpq key/value strings and `postgres://` URLs as-is. Strings
/// using `;` separated `Key=Value` pairs (`Host=db;Username=app;...`) are
/// translated key by key.
pub fn pg_config_from_connection_string(connection_string: &str) -> Result<PgConfig> {
    let trimmed = connection_string.trim();
    if trimmed.is_empty() {
        return Err(CloneError::Config(
            "Destination connection string is empty".to_string(),
        ));
    }

    if trimmed.contains("://") || !trimmed.contains(';') {
        return trimmed.parse::<PgConfig>().map_err(|e| {
            CloneError::Config(format!("Invalid destination connection string: {}", e))
        });
    }

    let mut config = PgConfig::new();
    let mut has_host = false;

    for part in trimmed.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = part.split_once('=') else {
            return Err(CloneError::Config(format!(
                "Invalid destination connection string segment: {:?}",
                part
            )));
        };
        let value = value.trim();

        match key.trim().to_ascii_lowercase().as_str() {
            "host" | "server" => {
                for host in value.split(',').map(str::trim).filter(|h| !h.is_empty()) {
                    config.host(host);
                    has_host = true;
                }
            }
            "port" => {
                let port = value.parse::<u16>().map_err(|_| {
                    CloneError::Config(format!("Invalid destination port: {:?}", value))
                })?;
                config.port(port);
            }
            "username" | "user id" | "userid" | "user" | "uid" => {
                config.user(value);
            }
            "password" | "pwd" => {
                config.password(value);
            }
            "database" | "dbname" => {
                config.dbname(value);
            }
            "application name" => {
                config.application_name(value);
            }
            other => debug!("Ignoring destination connection option {:?}", other),
        }
    }

    if !has_host {
        return Err(CloneError::Config(
            "Destination connection string has no Host".to_string(),
        ));
    }

    Ok(config)
}

fn describe_hosts(config: &PgConfig) -> String {
    config
        .get_hosts()
        .iter()
        .map(|h| match h {
            tokio_postgres::config::Host::Tcp(name) => name.clone(),
            #[cfg(unix)]
            tokio_postgres::config::Host::Unix(path) => path.display().to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npgsql_style_connection_string() {
        let config = pg_config_from_connection_string(
            "Host=db.local;Port=5433;Username=clone;Password=secret;Database=reports",
        )
        .unwrap();
        assert_eq!(describe_hosts(&config), "db.local");
        assert_eq!(config.get_ports(), &[5433u16]);
        assert_eq!(config.get_user(), Some("clone"));
        assert_eq!(config.get_password(), Some(&b"secret"[..]));
        assert_eq!(config.get_dbname(), Some("reports"));
    }

    #[test]
    fn test_npgsql_keys_are_case_insensitive() {
        let config =
            pg_config_from_connection_string("SERVER=pg;User Id=app;pwd=x;database=d;").unwrap();
        assert_eq!(describe_hosts(&config), "pg");
        assert_eq!(config.get_user(), Some("app"));
    }

    #[test]
    fn test_libpq_and_url_strings() {
        let kv = pg_config_from_connection_string("host=localhost user=postgres dbname=clone")
            .unwrap();
        assert_eq!(kv.get_dbname(), Some("clone"));

        let url = pg_config_from_connection_string("postgres://u:p@h:5432/db").unwrap();
        assert_eq!(url.get_user(), Some("u"));
        assert_eq!(url.get_dbname(), Some("db"));
    }

    #[test]
    fn test_invalid_connection_strings() {
        assert!(pg_config_from_connection_string("").is_err());
        assert!(pg_config_from_connection_string("Username=a;Database=b").is_err());
        assert!(pg_config_from_connection_string("Host=h;Port=abc").is_err());
        assert!(pg_config_from_connection_string("Host=h;garbage").is_err());
    }
}
