//! Clone orchestrator - main workflow coordinator.
//!
//! Tables are processed strictly in configured order, one at a time. Any
//! failure inside a table becomes a [`TableOutcome::Skipped`] and the run moves
//! on to the next table; a run never aborts because of one table.

use crate::config::Config;
use crate::core::identifier::sanitize;
use crate::dialect::truncate_sql;
use crate::error::{CloneError, Result};
use crate::provision::{ensure_table, introspect, resolve_primary_key};
use crate::source::{OdbcSourcePool, SourcePool};
use crate::target::{Executor, PgPool, TargetPool};
use crate::transfer::{format_duration, CopyEngine, CopyStats, TransferConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Clone orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn SourcePool>,
    executor: Arc<Executor>,
    progress_json: bool,
}

/// Why a table was skipped.
#[derive(Debug)]
pub enum SkipReason {
    /// Reading the source failed (schema probe, index catalog, count or page fetch).
    SourceAccess(CloneError),
    /// A column type has no destination mapping.
    UnsupportedType(CloneError),
    /// A page transaction failed; later pages were not attempted.
    PageWrite(CloneError),
    /// Provisioning, truncation or catalog lookups on the destination failed.
    Target(CloneError),
}

impl SkipReason {
    fn from_error(err: CloneError) -> Self {
        match err {
            CloneError::Source(_) => SkipReason::SourceAccess(err),
            CloneError::UnsupportedType { .. } => SkipReason::UnsupportedType(err),
            CloneError::PageWrite { .. } => SkipReason::PageWrite(err),
            _ => SkipReason::Target(err),
        }
    }

    /// Short machine-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::SourceAccess(_) => "source_access",
            SkipReason::UnsupportedType(_) => "unsupported_type",
            SkipReason::PageWrite(_) => "page_write",
            SkipReason::Target(_) => "target",
        }
    }

    pub fn error(&self) -> &CloneError {
        match self {
            SkipReason::SourceAccess(e)
            | SkipReason::UnsupportedType(e)
            | SkipReason::PageWrite(e)
            | SkipReason::Target(e) => e,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error())
    }
}

/// Outcome of cloning one table.
#[derive(Debug)]
pub enum TableOutcome {
    Copied(CopyStats),
    Skipped(SkipReason),
}

/// A table that was skipped during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedTable {
    pub table: String,
    pub kind: String,
    pub reason: String,
}

/// Result of a clone run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: String,

    /// `completed`, or `completed_with_skips` when any table was skipped.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Tables named in the configuration.
    pub tables_total: usize,

    /// Tables copied to the end.
    pub tables_copied: usize,

    /// Tables skipped because of an error.
    pub tables_skipped: usize,

    /// Rows written across all copied tables.
    pub rows_copied: u64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,

    pub skipped_tables: Vec<SkippedTable>,
}

impl RunResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome and latency of one connectivity probe.
type Probe = (std::result::Result<(), String>, u64);

/// Connectivity of both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}

impl HealthCheckResult {
    fn new(source: Probe, target: Probe) -> Self {
        let (source_result, source_latency_ms) = source;
        let (target_result, target_latency_ms) = target;
        let healthy = source_result.is_ok() && target_result.is_ok();
        Self {
            source_connected: source_result.is_ok(),
            source_latency_ms,
            source_error: source_result.err(),
            target_connected: target_result.is_ok(),
            target_latency_ms,
            target_error: target_result.err(),
            healthy,
        }
    }
}

impl Orchestrator {
    /// Connect to the source and the destination.
    pub async fn new(config: Config) -> Result<Self> {
        let source = OdbcSourcePool::new(config.source.connection_string.clone()).await?;
        let target = PgPool::new(&config.target.connection_string).await?;
        let executor = Executor::new(Arc::new(target), config.migration.echo);

        Ok(Self::from_pools(config, Arc::new(source), Arc::new(executor)))
    }

    /// Build an orchestrator around existing connections.
    pub fn from_pools(config: Config, source: Arc<dyn SourcePool>, executor: Arc<Executor>) -> Self {
        Self {
            config,
            source,
            executor,
            progress_json: false,
        }
    }

    /// Emit one JSON progress line per page on stderr.
    pub fn with_progress(mut self, progress_json: bool) -> Self {
        self.progress_json = progress_json;
        self
    }

    /// Source and target driver names, e.g. `ads -> postgres`.
    pub fn endpoints(&self) -> String {
        format!(
            "{} -> {}",
            self.source.db_type(),
            self.executor.target().db_type()
        )
    }

    /// Clone every configured table, in order.
    pub async fn run(&self) -> RunResult {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let tables = &self.config.migration.tables;

        info!(
            "Starting clone run {} ({} tables, {})",
            run_id,
            tables.len(),
            self.endpoints()
        );
        if self.executor.is_echo() {
            info!("Echo mode: statements are printed, not executed");
        }

        let mut tables_copied = 0;
        let mut rows_copied: u64 = 0;
        let mut skipped_tables = Vec::new();

        for table in tables {
            match self.clone_table(table).await {
                TableOutcome::Copied(stats) => {
                    tables_copied += 1;
                    rows_copied += stats.rows_copied;
                }
                TableOutcome::Skipped(reason) => {
                    skipped_tables.push(SkippedTable {
                        table: table.clone(),
                        kind: reason.kind().to_string(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let rows_per_second = if duration > 0.0 {
            (rows_copied as f64 / duration) as u64
        } else {
            0
        };

        let status = if skipped_tables.is_empty() {
            "completed"
        } else {
            "completed_with_skips"
        };

        info!(
            "Clone run {} {}: {} of {} tables, {} rows",
            run_id,
            status,
            tables_copied,
            tables.len(),
            rows_copied
        );

        RunResult {
            run_id,
            status: status.to_string(),
            duration_seconds: duration,
            started_at,
            completed_at,
            tables_total: tables.len(),
            tables_copied,
            tables_skipped: skipped_tables.len(),
            rows_copied,
            rows_per_second,
            skipped_tables,
        }
    }

    /// Clone one table. Errors are returned as [`TableOutcome::Skipped`].
    pub async fn clone_table(&self, name: &str) -> TableOutcome {
        let source_table = name.trim().to_uppercase();
        let dest_table = sanitize(&source_table);
        let start = Instant::now();

        info!("{}: cloning into {}", source_table, dest_table);

        match self.copy_table(&source_table, &dest_table).await {
            Ok(stats) => {
                info!(
                    "{}: total time: {}",
                    dest_table,
                    format_duration(start.elapsed().as_millis() as u64)
                );
                TableOutcome::Copied(stats)
            }
            Err(e) => {
                let reason = SkipReason::from_error(e);
                error!("{}: skipped: {}", source_table, reason);
                TableOutcome::Skipped(reason)
            }
        }
    }

    async fn copy_table(&self, source_table: &str, dest_table: &str) -> Result<CopyStats> {
        let create_start = Instant::now();
        let (schema, indexes) = introspect(self.source.as_ref(), source_table).await?;

        let provision = ensure_table(
            &self.executor,
            &schema,
            dest_table,
            &indexes,
            self.config.migration.create_indexes,
        )
        .await?;

        if provision.created {
            debug!(
                "{}: creation time: {} ({} indexes skipped)",
                dest_table,
                format_duration(create_start.elapsed().as_millis() as u64),
                provision.skipped_indexes()
            );
        }

        self.executor.execute(&truncate_sql(dest_table)?).await?;

        let pk = resolve_primary_key(self.executor.target().as_ref(), dest_table).await?;

        let engine = CopyEngine::new(
            self.source.clone(),
            self.executor.clone(),
            TransferConfig {
                page_size: self.config.migration.get_page_size(),
                progress_json: self.progress_json,
            },
        );
        engine.copy_rows(&schema, dest_table, &pk).await
    }

    /// Ping both ends over the existing connections.
    pub async fn health_check(&self) -> HealthCheckResult {
        let source = timed(self.source.ping()).await;
        let target = timed(self.executor.target().ping()).await;
        HealthCheckResult::new(source, target)
    }

    /// Connect to both ends and ping them, reporting failures instead of returning them.
    pub async fn check_config(config: &Config) -> HealthCheckResult {
        let source = timed(probe_source(&config.source.connection_string)).await;
        let target = timed(probe_target(&config.target.connection_string)).await;
        HealthCheckResult::new(source, target)
    }

    /// Close both connections.
    pub async fn close(&self) {
        self.source.close().await;
        self.executor.target().close().await;
    }
}

async fn probe_source(connection_string: &str) -> Result<()> {
    let pool = OdbcSourcePool::new(connection_string).await?;
    let result = pool.ping().await;
    pool.close().await;
    result
}

async fn probe_target(connection_string: &str) -> Result<()> {
    let pool = PgPool::new(connection_string).await?;
    let result = pool.ping().await;
    pool.close().await;
    result
}

async fn timed<F>(fut: F) -> Probe
where
    F: std::future::Future<Output = Result<()>>,
{
    let start = Instant::now();
    let result = fut.await.map_err(|e| e.to_string());
    (result, start.elapsed().as_millis() as u64)
}
