//! In-memory source and target used by unit tests.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::{ColumnDefinition, IndexDefinition, Rows, SqlValue, TableSchema};
use crate::dialect::render_statement;
use crate::error::{CloneError, Result};
use crate::source::SourcePool;
use crate::target::TargetPool;

/// One table served by [`MockSource`].
#[derive(Clone, Default)]
pub struct MockTable {
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
    pub rows: Rows,
}

/// Source serving tables from memory.
#[derive(Default)]
pub struct MockSource {
    tables: HashMap<String, MockTable>,
    failing: HashSet<String>,
    disconnected: HashSet<String>,
    page_requests: Mutex<Vec<(String, usize, usize)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: MockTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    /// Every query against `name` fails as if the table were unreadable.
    pub fn with_failing_table(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Every query against `name` fails as if the source connection dropped.
    pub fn with_disconnected_table(mut self, name: &str) -> Self {
        self.disconnected.insert(name.to_string());
        self
    }

    /// `(table, page_size, start_row)` of every page fetched, in order.
    pub fn page_requests(&self) -> Vec<(String, usize, usize)> {
        self.page_requests.lock().unwrap().clone()
    }

    fn table(&self, name: &str) -> Result<&MockTable> {
        if self.failing.contains(name) {
            return Err(CloneError::Source(format!("table {} is encrypted", name)));
        }
        if self.disconnected.contains(name) {
            return Err(CloneError::pool(
                "ODBC connection failed: communication link failure",
                "getting ODBC connection",
            ));
        }
        self.tables
            .get(name)
            .ok_or_else(|| CloneError::Source(format!("table {} not found", name)))
    }
}

#[async_trait]
impl SourcePool for MockSource {
    async fn probe_columns(&self, table: &str) -> Result<TableSchema> {
        Ok(TableSchema {
            source_table_name: table.to_string(),
            columns: self.table(table)?.columns.clone(),
        })
    }

    async fn load_indexes(&self, table: &str) -> Result<Vec<IndexDefinition>> {
        Ok(self.table(table)?.indexes.clone())
    }

    async fn get_row_count(&self, table: &str) -> Result<i64> {
        Ok(self.table(table)?.rows.len() as i64)
    }

    async fn fetch_page(
        &self,
        schema: &TableSchema,
        page_size: usize,
        start_row: usize,
    ) -> Result<Rows> {
        let table = self.table(&schema.source_table_name)?;
        self.page_requests.lock().unwrap().push((
            schema.source_table_name.clone(),
            page_size,
            start_row,
        ));
        Ok(table
            .rows
            .iter()
            .skip(start_row.saturating_sub(1))
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mock-ads"
    }

    async fn close(&self) {}
}

/// Target recording every statement it receives.
///
/// `CREATE TABLE` registers the table so later existence checks see it.
/// Page writes are recorded as `BEGIN`, one rendered statement per row and
/// `COMMIT`, matching the echo script layout.
#[derive(Default)]
pub struct MockTarget {
    statements: Mutex<Vec<String>>,
    tables: Mutex<HashSet<String>>,
    primary_keys: Mutex<HashMap<String, (String, Vec<String>)>>,
    fail_on: Mutex<Vec<String>>,
    pages: Mutex<Vec<Rows>>,
}

impl MockTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `table` already exists.
    pub fn with_existing_table(self, table: &str) -> Self {
        self.tables.lock().unwrap().insert(table.to_string());
        self
    }

    pub fn with_primary_key(self, table: &str, constraint: &str, columns: &[&str]) -> Self {
        self.primary_keys.lock().unwrap().insert(
            table.to_string(),
            (
                constraint.to_string(),
                columns.iter().map(|c| c.to_string()).collect(),
            ),
        );
        self
    }

    /// Fail any statement containing `fragment`.
    pub fn fail_on(self, fragment: &str) -> Self {
        self.fail_on.lock().unwrap().push(fragment.to_string());
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    /// Rows of every committed page, in commit order.
    pub fn pages(&self) -> Vec<Rows> {
        self.pages.lock().unwrap().clone()
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        let fail_on = self.fail_on.lock().unwrap();
        match fail_on.iter().find(|f| sql.contains(f.as_str())) {
            Some(fragment) => Err(CloneError::statement(
                sql,
                format!("injected failure on {:?}", fragment),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TargetPool for MockTarget {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.lock().unwrap().contains(table))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        self.check_failure(sql)?;
        self.statements.lock().unwrap().push(sql.to_string());

        if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS \"") {
            if let Some((name, _)) = rest.split_once('"') {
                self.tables.lock().unwrap().insert(name.to_string());
            }
        }
        Ok(0)
    }

    async fn primary_key_constraint(&self, table: &str) -> Result<Option<String>> {
        Ok(self
            .primary_keys
            .lock()
            .unwrap()
            .get(table)
            .map(|(name, _)| name.clone()))
    }

    async fn constraint_columns(&self, table: &str, constraint: &str) -> Result<Vec<String>> {
        Ok(self
            .primary_keys
            .lock()
            .unwrap()
            .get(table)
            .filter(|(name, _)| name == constraint)
            .map(|(_, cols)| cols.clone())
            .unwrap_or_default())
    }

    async fn write_page(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64> {
        self.check_failure(sql)?;

        let mut statements = self.statements.lock().unwrap();
        statements.push("BEGIN".to_string());
        statements.extend(rows.iter().map(|row| render_statement(sql, row)));
        statements.push("COMMIT".to_string());

        self.pages.lock().unwrap().push(rows.to_vec());
        Ok(rows.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mock-pg"
    }

    async fn close(&self) {}
}

/// Cloneable in-memory writer for capturing echo output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    /// Echoed statements with the trailing `;` removed.
    pub fn statements(&self) -> Vec<String> {
        self.contents()
            .lines()
            .map(|l| l.trim_end_matches(';').to_string())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
