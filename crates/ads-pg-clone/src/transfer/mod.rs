//! Paginated copy engine.
//!
//! A table is copied in fixed-size pages, strictly in order. Each page is
//! fetched from the source and written to the destination in one
//! transaction, so a failure rolls back only that page and stops the table.
//! The row count is read once up front and is not refreshed while paging.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::identifier::sanitize;
use crate::core::{PrimaryKeyInfo, Rows, SqlNullType, SqlValue, TableSchema};
use crate::dialect::insert_sql;
use crate::error::{CloneError, Result};
use crate::source::SourcePool;
use crate::target::Executor;

/// Rows per page unless configured otherwise.
pub const PAGE_SIZE: usize = 1000;

/// One page of a table: 1-based page number, 1-based first row, row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub page: usize,
    pub start_row: u64,
    pub len: u64,
}

/// Number of pages needed for `total_rows`.
pub fn page_count(total_rows: u64, page_size: usize) -> usize {
    let page_size = page_size.max(1) as u64;
    total_rows.div_ceil(page_size) as usize
}

/// Split `[1, total_rows]` into consecutive pages of `page_size` rows.
///
/// The last page holds the remainder; zero rows yields no pages.
pub fn page_ranges(total_rows: u64, page_size: usize) -> Vec<PageRange> {
    let size = page_size.max(1) as u64;
    (0..page_count(total_rows, page_size))
        .map(|i| {
            let start_row = i as u64 * size + 1;
            PageRange {
                page: i + 1,
                start_row,
                len: size.min(total_rows - start_row + 1),
            }
        })
        .collect()
}

/// Progress of one table copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CopyProgress {
    pub rows_copied: u64,
    pub total_rows: u64,
    pub elapsed_ms: u64,
}

impl CopyProgress {
    pub fn new(total_rows: u64) -> Self {
        Self {
            total_rows,
            ..Default::default()
        }
    }

    /// Record a written page; the copied count never exceeds the total.
    pub fn advance(&mut self, rows: u64, elapsed_ms: u64) {
        self.rows_copied = (self.rows_copied + rows).min(self.total_rows);
        self.elapsed_ms = elapsed_ms;
    }

    pub fn is_complete(&self) -> bool {
        self.rows_copied >= self.total_rows
    }

    /// `elapsed * remaining / copied`, multiplied first so short pages do not
    /// round the rate down to zero. `None` before the first row or once done.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        if self.rows_copied == 0 || self.is_complete() {
            return None;
        }
        let remaining = (self.total_rows - self.rows_copied) as u128;
        let estimate = self.elapsed_ms as u128 * remaining / self.rows_copied as u128;
        Some(estimate.min(u64::MAX as u128) as u64)
    }
}

/// Format milliseconds as `H hours and M minutes`, `M minutes and S seconds`
/// or `S seconds`, depending on magnitude.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = total_seconds / 60;

    if hours >= 1 {
        format!("{} hours and {} minutes", hours, minutes % 60)
    } else if minutes >= 1 {
        format!("{} minutes and {} seconds", minutes, total_seconds % 60)
    } else {
        format!("{} seconds", total_seconds)
    }
}

/// Trim text values; empty or all-whitespace text becomes NULL.
pub fn clean_value(value: SqlValue) -> SqlValue {
    match value {
        SqlValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                SqlValue::Null(SqlNullType::String)
            } else if trimmed.len() == s.len() {
                SqlValue::String(s)
            } else {
                SqlValue::String(trimmed.to_string())
            }
        }
        other => other,
    }
}

fn clean_rows(rows: Rows) -> Rows {
    rows.into_iter()
        .map(|row| row.into_iter().map(clean_value).collect())
        .collect()
}

/// Copy engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Number of rows per page.
    pub page_size: usize,
    /// Emit one JSON progress line per page on stderr.
    pub progress_json: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            progress_json: false,
        }
    }
}

/// Statistics from one table copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    /// Source row count read before paging.
    pub total_rows: u64,
    pub rows_copied: u64,
    pub pages: usize,
    pub elapsed_ms: u64,
}

/// Progress line written to stderr with `progress_json`.
#[derive(Debug, Serialize)]
struct ProgressUpdate<'a> {
    table: &'a str,
    rows_copied: u64,
    total_rows: u64,
    elapsed_ms: u64,
    eta_ms: Option<u64>,
}

/// Copies table rows page by page.
pub struct CopyEngine {
    source: Arc<dyn SourcePool>,
    executor: Arc<Executor>,
    config: TransferConfig,
}

impl CopyEngine {
    pub fn new(source: Arc<dyn SourcePool>, executor: Arc<Executor>, config: TransferConfig) -> Self {
        Self {
            source,
            executor,
            config,
        }
    }

    /// Copy all rows of `schema` into `dest_table`.
    ///
    /// Rows are written with a plain insert, or an upsert when `pk` has
    /// columns. Source failures propagate as-is; a failed page write becomes
    /// `PageWrite` and ends the copy without touching later pages.
    pub async fn copy_rows(
        &self,
        schema: &TableSchema,
        dest_table: &str,
        pk: &PrimaryKeyInfo,
    ) -> Result<CopyStats> {
        let total_rows = self
            .source
            .get_row_count(&schema.source_table_name)
            .await
            .map_err(CloneError::into_source)?
            .max(0) as u64;
        debug!("{}: total rows in source table: {}", dest_table, total_rows);

        let mut stats = CopyStats {
            total_rows,
            ..Default::default()
        };
        if total_rows == 0 {
            return Ok(stats);
        }

        let columns: Vec<String> = schema.column_names().iter().map(|c| sanitize(c)).collect();
        let sql = insert_sql(dest_table, &columns, pk)?;
        let page_size = self.config.page_size.max(1);

        let start = Instant::now();
        let mut progress = CopyProgress::new(total_rows);

        for range in page_ranges(total_rows, page_size) {
            let rows = self
                .source
                .fetch_page(schema, page_size, range.start_row as usize)
                .await
                .map_err(CloneError::into_source)?;

            if rows.is_empty() {
                warn!(
                    "{}: page {} starting at row {} returned no rows, stopping",
                    dest_table, range.page, range.start_row
                );
                break;
            }

            let rows = clean_rows(rows);
            let fetched = rows.len() as u64;

            self.executor
                .write_page(&sql, &rows)
                .await
                .map_err(|e| CloneError::page_write(dest_table, range.page, e))?;

            stats.pages += 1;
            progress.advance(fetched, start.elapsed().as_millis() as u64);
            self.report(dest_table, &progress);
        }

        stats.rows_copied = progress.rows_copied;
        stats.elapsed_ms = start.elapsed().as_millis() as u64;

        debug!(
            "{}: total copy time: {}",
            dest_table,
            format_duration(stats.elapsed_ms)
        );

        Ok(stats)
    }

    fn report(&self, table: &str, progress: &CopyProgress) {
        let eta = progress.estimated_remaining_ms();

        if let Some(eta) = eta {
            info!(
                "{}: rows copied: {} of {} - time taken: {} - estimated time remaining: {}",
                table,
                progress.rows_copied,
                progress.total_rows,
                format_duration(progress.elapsed_ms),
                format_duration(eta)
            );
        } else {
            info!(
                "{}: rows copied: {} of {} - time taken: {}",
                table,
                progress.rows_copied,
                progress.total_rows,
                format_duration(progress.elapsed_ms)
            );
        }

        if self.config.progress_json {
            let update = ProgressUpdate {
                table,
                rows_copied: progress.rows_copied,
                total_rows: progress.total_rows,
                elapsed_ms: progress.elapsed_ms,
                eta_ms: eta,
            };
            if let Ok(line) = serde_json::to_string(&update) {
                eprintln!("{}", line);
            }
        }
    }
}
