//! Reference lookups - sample a value from another table

use std::sync::Arc;

use crate::backends::{DatabaseConnection, DatabaseValue};
use crate::dialect::SqlDialect;
use crate::error::{OrmError, OrmResult};

/// Resolves `reference_table` rules through the run's connection
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    dialect: Arc<dyn SqlDialect>,
}

impl ReferenceResolver {
    pub fn new(dialect: Arc<dyn SqlDialect>) -> Self {
        Self { dialect }
    }

    /// One random `column` value from `table`; `EmptyReference` when the table has no rows
    pub async fn lookup(
        &self,
        conn: &mut dyn DatabaseConnection,
        table: &str,
        column: &str,
    ) -> OrmResult<DatabaseValue> {
        let sql = self.dialect.random_row_query(table, column);
        match conn.fetch_optional(&sql, &[]).await? {
            Some(row) => row.get_by_index(0),
            None => Err(OrmError::EmptyReference {
                table: table.to_string(),
                column: column.to_string(),
            }),
        }
    }

    /// Like [`lookup`](Self::lookup) but an empty table logs a warning and yields `Null`
    pub async fn resolve(
        &self,
        conn: &mut dyn DatabaseConnection,
        table: &str,
        column: &str,
    ) -> OrmResult<DatabaseValue> {
        match self.lookup(conn, table, column).await {
            Err(e) if e.is_recoverable() => {
                tracing::warn!(target: "tabula::factory", "{}; using NULL", e);
                Ok(DatabaseValue::Null)
            }
            other => other,
        }
    }
}
