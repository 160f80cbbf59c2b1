//! Single choke point for every statement that changes the destination.
//!
//! With echo enabled nothing reaches the database; each statement is written
//! to the echo sink as a `;`-terminated line instead, so the output replays as
//! a SQL script. Page writes appear as `BEGIN;`, one rendered row statement per
//! row, then `COMMIT;`.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::core::SqlValue;
use crate::dialect::render_statement;
use crate::error::Result;

use super::TargetPool;

/// Runs or echoes mutating statements against a target.
pub struct Executor {
    target: Arc<dyn TargetPool>,
    echo: Option<Mutex<Box<dyn Write + Send>>>,
}

impl Executor {
    /// Create an executor; `echo` sends statements to stdout instead of the target.
    pub fn new(target: Arc<dyn TargetPool>, echo: bool) -> Self {
        let echo = echo.then(|| Mutex::new(Box::new(std::io::stdout()) as Box<dyn Write + Send>));
        Self { target, echo }
    }

    /// Create an echoing executor writing to `sink`.
    pub fn with_echo_sink(target: Arc<dyn TargetPool>, sink: Box<dyn Write + Send>) -> Self {
        Self {
            target,
            echo: Some(Mutex::new(sink)),
        }
    }

    /// The target used for catalog reads, which are never echoed.
    pub fn target(&self) -> &Arc<dyn TargetPool> {
        &self.target
    }

    pub fn is_echo(&self) -> bool {
        self.echo.is_some()
    }

    /// Execute one statement, or echo it.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        if self.echo.is_some() {
            self.echo_lines(std::iter::once(sql.to_string()))?;
            return Ok(0);
        }

        debug!("Executing: {}", sql);
        self.target.execute(sql).await
    }

    /// Write one page of rows in a single transaction, or echo it.
    ///
    /// In echo mode the reported count is the number of rows rendered.
    pub async fn write_page(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64> {
        if self.echo.is_some() {
            let lines = std::iter::once("BEGIN".to_string())
                .chain(rows.iter().map(|row| render_statement(sql, row)))
                .chain(std::iter::once("COMMIT".to_string()));
            self.echo_lines(lines)?;
            return Ok(rows.len() as u64);
        }

        debug!("Writing {} rows with: {}", rows.len(), sql);
        self.target.write_page(sql, rows).await
    }

    fn echo_lines(&self, lines: impl Iterator<Item = String>) -> Result<()> {
        let Some(sink) = &self.echo else {
            return Ok(());
        };

        let mut out = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for line in lines {
            writeln!(out, "{};", line)?;
        }
        out.flush()?;
        Ok(())
    }
}
