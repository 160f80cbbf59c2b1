//! Schema introspection and destination table provisioning.

use tracing::{debug, info};

use crate::core::{IndexDefinition, PrimaryKeyInfo, TableSchema};
use crate::dialect::{create_index_sql, create_table_sql};
use crate::error::{CloneError, Result};
use crate::source::SourcePool;
use crate::target::{Executor, TargetPool};

/// Result of creating one index.
#[derive(Debug)]
pub enum IndexOutcome {
    Created { index: String, sql: String },
    /// The statement failed; always an [`CloneError::IndexCreation`].
    Skipped(CloneError),
}

/// What [`ensure_table`] did.
#[derive(Debug, Default)]
pub struct ProvisionOutcome {
    /// False when the table already existed and nothing was issued.
    pub created: bool,
    pub indexes: Vec<IndexOutcome>,
}

impl ProvisionOutcome {
    pub fn skipped_indexes(&self) -> usize {
        self.indexes
            .iter()
            .filter(|i| matches!(i, IndexOutcome::Skipped(_)))
            .count()
    }
}

/// Read a table's columns and declared indexes from the source.
///
/// Only the single-row schema probe and the index catalog query are issued;
/// index entries with a blank name or key are dropped.
pub async fn introspect(
    source: &dyn SourcePool,
    table: &str,
) -> Result<(TableSchema, Vec<IndexDefinition>)> {
    let schema = source
        .probe_columns(table)
        .await
        .map_err(CloneError::into_source)?;
    let indexes = source
        .load_indexes(table)
        .await
        .map_err(CloneError::into_source)?
        .into_iter()
        .filter(|i| !i.name.trim().is_empty() && !i.raw_key_expression.trim().is_empty())
        .collect::<Vec<_>>();

    debug!(
        "{}: {} columns, {} indexes",
        table,
        schema.columns.len(),
        indexes.len()
    );
    Ok((schema, indexes))
}

/// Create the destination table and its indexes unless it already exists.
///
/// The column list is mapped before the existence check, so a source with an
/// unsupported column type fails with `UnsupportedType` even when the
/// destination table is already present. Index failures never fail the table.
pub async fn ensure_table(
    executor: &Executor,
    schema: &TableSchema,
    dest_table: &str,
    indexes: &[IndexDefinition],
    create_indexes: bool,
) -> Result<ProvisionOutcome> {
    let create_sql = create_table_sql(dest_table, schema)?;

    if executor.target().table_exists(dest_table).await? {
        debug!("{}: table exists, skipping creation", dest_table);
        return Ok(ProvisionOutcome::default());
    }

    executor.execute(&create_sql).await?;
    info!("{}: table created", dest_table);

    let mut outcome = ProvisionOutcome {
        created: true,
        indexes: Vec::with_capacity(indexes.len()),
    };

    if !create_indexes {
        return Ok(outcome);
    }

    for index in indexes {
        let result = match create_index_sql(dest_table, index) {
            Ok(sql) => executor.execute(&sql).await.map(|_| sql),
            Err(e) => Err(e),
        };

        match result {
            Ok(sql) => {
                debug!("{}: index created: {}", dest_table, sql);
                outcome.indexes.push(IndexOutcome::Created {
                    index: index.name.clone(),
                    sql,
                });
            }
            Err(e) => {
                debug!("{}: failed to create index {}: {}", dest_table, index.name, e);
                outcome.indexes.push(IndexOutcome::Skipped(CloneError::IndexCreation {
                    index: index.name.clone(),
                    message: e.to_string(),
                }));
            }
        }
    }

    Ok(outcome)
}

/// Look up the destination table's primary key.
pub async fn resolve_primary_key(target: &dyn TargetPool, dest_table: &str) -> Result<PrimaryKeyInfo> {
    let Some(constraint) = target.primary_key_constraint(dest_table).await? else {
        return Ok(PrimaryKeyInfo::none());
    };

    let columns = target.constraint_columns(dest_table, &constraint).await?;
    debug!("{}: primary key {} on {:?}", dest_table, constraint, columns);
    Ok(PrimaryKeyInfo::with_columns(columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDefinition, SourceType};
    use crate::testing::{MockSource, MockTable, MockTarget};
    use std::sync::Arc;

    fn schema() -> TableSchema {
        TableSchema {
            source_table_name: "AISRPTS".into(),
            columns: vec![
                ColumnDefinition::new("REPORT", SourceType::String),
                ColumnDefinition::new("NAME", SourceType::String),
            ],
        }
    }

    #[tokio::test]
    async fn test_introspect_drops_blank_indexes() {
        let source = MockSource::new().with_table(
            "AISRPTS",
            MockTable {
                columns: schema().columns,
                indexes: vec![
                    IndexDefinition::new("REPORT", "REPORT"),
                    IndexDefinition::new("", "NAME"),
                    IndexDefinition::new("NONAME", "  "),
                ],
                rows: vec![],
            },
        );

        let (schema, indexes) = introspect(&source, "AISRPTS").await.unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(indexes, vec![IndexDefinition::new("REPORT", "REPORT")]);
    }

    #[tokio::test]
    async fn test_introspect_reports_connection_loss_as_source() {
        let source = MockSource::new().with_disconnected_table("AISRPTS");

        let err = introspect(&source, "AISRPTS").await.unwrap_err();
        assert!(matches!(err, CloneError::Source(ref m) if m.contains("ODBC connection failed")));
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let target = Arc::new(MockTarget::new());
        let executor = Executor::new(target.clone(), false);
        let indexes = vec![IndexDefinition::new("REPORT", "REPORT")];

        let first = ensure_table(&executor, &schema(), "aisrpts", &indexes, true)
            .await
            .unwrap();
        let second = ensure_table(&executor, &schema(), "aisrpts", &indexes, true)
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        let creates = target
            .statements()
            .iter()
            .filter(|s| s.starts_with("CREATE TABLE"))
            .count();
        assert_eq!(creates, 1);
        assert_eq!(target.statements().len(), 2);
    }

    #[tokio::test]
    async fn test_index_failure_is_not_fatal() {
        let target = Arc::new(MockTarget::new().fail_on("\"bad_idx\""));
        let executor = Executor::new(target.clone(), false);
        let indexes = vec![
            IndexDefinition::new("BAD", "DESCEND(NAME)"),
            IndexDefinition::new("GOOD", "REPORT+upper(NAME)"),
        ];

        let outcome = ensure_table(&executor, &schema(), "aisrpts", &indexes, true)
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.skipped_indexes(), 1);
        assert!(matches!(
            &outcome.indexes[0],
            IndexOutcome::Skipped(CloneError::IndexCreation { index, .. }) if index == "BAD"
        ));
        assert!(target
            .statements()
            .contains(&"CREATE INDEX \"good_idx\" ON \"aisrpts\" (REPORT,upper(NAME))".to_string()));
    }

    #[tokio::test]
    async fn test_indexes_can_be_disabled() {
        let target = Arc::new(MockTarget::new());
        let executor = Executor::new(target.clone(), false);
        let indexes = vec![IndexDefinition::new("REPORT", "REPORT")];

        let outcome = ensure_table(&executor, &schema(), "aisrpts", &indexes, false)
            .await
            .unwrap();

        assert!(outcome.indexes.is_empty());
        assert_eq!(target.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_type_issues_nothing() {
        let target = Arc::new(MockTarget::new());
        let executor = Executor::new(target.clone(), false);
        let mut schema = schema();
        schema
            .columns
            .push(ColumnDefinition::new("AMOUNT", SourceType::Other("Double".into())));

        let err = ensure_table(&executor, &schema, "aisrpts", &[], true)
            .await
            .unwrap_err();

        assert!(matches!(err, CloneError::UnsupportedType { .. }));
        assert!(target.statements().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_primary_key() {
        let target = MockTarget::new().with_primary_key("aisrpts", "aisrpts_pkey", &["report", "line"]);

        let pk = resolve_primary_key(&target, "aisrpts").await.unwrap();
        assert!(pk.has_primary_key);
        assert_eq!(pk.columns, vec!["report", "line"]);

        let none = resolve_primary_key(&target, "other").await.unwrap();
        assert_eq!(none, PrimaryKeyInfo::none());
    }
}
