//! Migration Ledger - Tracks applied migrations in the database
//!
//! A migration file is either absent from the ledger (pending) or present
//! with the batch it was applied in. Rolling back removes the row.

use std::collections::HashSet;
use std::sync::Arc;

use crate::backends::{DatabaseConnection, DatabaseValue};
use crate::dialect::SqlDialect;
use crate::error::{OrmError, OrmResult};
use super::definitions::LedgerEntry;

/// Ledger state for one run
#[derive(Debug)]
pub struct MigrationLedger {
    dialect: Arc<dyn SqlDialect>,
    table: String,
    next_batch: Option<i64>,
    applied: Option<HashSet<String>>,
}

impl MigrationLedger {
    pub fn new(dialect: Arc<dyn SqlDialect>, table: impl Into<String>) -> Self {
        Self {
            dialect,
            table: table.into(),
            next_batch: None,
            applied: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if missing and add the `batch` column to legacy tables
    pub async fn ensure_table(&mut self, conn: &mut dyn DatabaseConnection) -> OrmResult<()> {
        conn.execute(&self.dialect.ledger_table_sql(&self.table), &[]).await?;

        let columns = conn
            .fetch_all(&self.dialect.ledger_batch_column_sql(&self.table), &[])
            .await?;
        if columns.is_empty() {
            tracing::info!(target: "tabula::ledger", "Adding missing 'batch' column to {} table", self.table);
            conn.execute(&self.dialect.ledger_add_batch_column_sql(&self.table), &[]).await?;
            tracing::info!(target: "tabula::ledger", "'batch' column added");
        }

        Ok(())
    }

    /// `max(batch) + 1`, computed once and reused for the rest of the run
    pub async fn next_batch(&mut self, conn: &mut dyn DatabaseConnection) -> OrmResult<i64> {
        if let Some(batch) = self.next_batch {
            return Ok(batch);
        }

        let sql = format!("SELECT COALESCE(MAX(batch), 0) + 1 AS batch FROM {}", self.table);
        let row = conn
            .fetch_optional(&sql, &[])
            .await?
            .ok_or_else(|| OrmError::sql("Batch query returned no rows", Some(&sql)))?;
        let batch = row
            .get_by_index(0)?
            .as_i64()
            .ok_or_else(|| OrmError::sql("Batch query returned a non-integer value", Some(&sql)))?;

        self.next_batch = Some(batch);
        Ok(batch)
    }

    /// Names of every recorded migration
    pub async fn applied(&mut self, conn: &mut dyn DatabaseConnection) -> OrmResult<&HashSet<String>> {
        if self.applied.is_none() {
            let sql = format!("SELECT migration FROM {}", self.table);
            let rows = conn.fetch_all(&sql, &[]).await?;

            let mut applied = HashSet::with_capacity(rows.len());
            for row in rows {
                if let DatabaseValue::String(name) = row.get_by_index(0)? {
                    applied.insert(name);
                }
            }
            self.applied = Some(applied);
        }

        Ok(&*self.applied.get_or_insert_with(HashSet::new))
    }

    pub async fn is_applied(&mut self, conn: &mut dyn DatabaseConnection, migration: &str) -> OrmResult<bool> {
        Ok(self.applied(conn).await?.contains(migration))
    }

    /// Insert one ledger row after the migration's script succeeded
    pub async fn record(&mut self, conn: &mut dyn DatabaseConnection, migration: &str, batch: i64) -> OrmResult<()> {
        let sql = format!(
            "INSERT INTO {} (migration, batch) VALUES ({}, {})",
            self.table,
            self.dialect.placeholder(1),
            self.dialect.placeholder(2)
        );
        conn.execute(&sql, &[DatabaseValue::from(migration), DatabaseValue::Int64(batch)])
            .await?;

        if let Some(applied) = self.applied.as_mut() {
            applied.insert(migration.to_string());
        }
        tracing::debug!(target: "tabula::ledger", "Recorded {} in batch {}", migration, batch);
        Ok(())
    }

    /// Delete the ledger row after the rollback script succeeded
    pub async fn forget(&mut self, conn: &mut dyn DatabaseConnection, migration: &str) -> OrmResult<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE migration = {}",
            self.table,
            self.dialect.placeholder(1)
        );
        let removed = conn.execute(&sql, &[DatabaseValue::from(migration)]).await?;

        if let Some(applied) = self.applied.as_mut() {
            applied.remove(migration);
        }
        tracing::debug!(target: "tabula::ledger", "Forgot {} ({} row(s))", migration, removed);
        Ok(removed)
    }

    /// Every ledger row in insertion order
    pub async fn entries(&self, conn: &mut dyn DatabaseConnection) -> OrmResult<Vec<LedgerEntry>> {
        let sql = format!("SELECT migration, batch, created_at FROM {} ORDER BY id", self.table);
        let rows = conn.fetch_all(&sql, &[]).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let migration = match row.get_by_name("migration")? {
                DatabaseValue::String(name) => name,
                other => other.to_string(),
            };
            let batch = row.get_by_name("batch")?.as_i64().unwrap_or(1);
            let created_at = match row.get_by_name("created_at")? {
                DatabaseValue::DateTime(dt) => Some(dt),
                _ => None,
            };
            entries.push(LedgerEntry { migration, batch, created_at });
        }

        Ok(entries)
    }
}
