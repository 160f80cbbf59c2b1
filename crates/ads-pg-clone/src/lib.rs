//! # ads-pg-clone
//!
//! Clone Advantage Database Server tables into PostgreSQL.
//!
//! Each configured table is read over ODBC and copied into PostgreSQL:
//!
//! - **Provisioning**: `CREATE TABLE IF NOT EXISTS` from the source column
//!   types, plus the source's indexes with their key expressions translated
//! - **Paginated copy**: fixed-size pages, one transaction per page
//! - **Upsert** when the destination table has a primary key
//! - **Echo mode** printing every statement as a replayable SQL script
//!   instead of executing it
//!
//! A failing table is skipped and the run continues with the next one.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ads_pg_clone::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> ads_pg_clone::Result<()> {
//!     let config = Config::load("config.json")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run().await;
//!     println!("Copied {} rows", result.rows_copied);
//!     orchestrator.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod error;
pub mod orchestrator;
pub mod provision;
pub mod source;
pub mod target;
pub mod transfer;
pub mod typemap;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, SourceConfig, TargetConfig};
pub use error::{CloneError, Result};
pub use orchestrator::{HealthCheckResult, Orchestrator, RunResult, SkipReason, TableOutcome};
pub use source::{OdbcSourcePool, SourcePool};
pub use target::{Executor, PgPool, TargetPool};
pub use transfer::{CopyEngine, CopyStats, TransferConfig};
