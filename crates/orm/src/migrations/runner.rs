//! Migration Driver - Executes migration documents against the database
//!
//! Reads documents, consults the ledger for what is pending, compiles the
//! scripts and runs each one inside its own transaction block. A file is
//! recorded (or forgotten) only when every statement of its script succeeded.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::backends::DatabaseConnection;
use crate::dialect::{SqlDialect, SqlScript};
use crate::error::{OrmError, OrmResult};
use super::compiler::SchemaCompiler;
use super::definitions::{MigrationConfig, MigrationRunResult, MigrationStatus, RollbackResult};
use super::ledger::MigrationLedger;
use super::manager::{read_document, MigrationManager};

/// What happens to the ledger once a script's statements succeeded
#[derive(Debug, Clone, Copy)]
enum LedgerStep {
    Record(i64),
    Forget,
}

/// Migration driver bound to one dialect and one migrations directory
#[derive(Debug, Clone)]
pub struct MigrationDriver {
    manager: MigrationManager,
    compiler: SchemaCompiler,
}

impl MigrationDriver {
    pub fn new(dialect: Arc<dyn SqlDialect>, config: MigrationConfig) -> Self {
        Self {
            manager: MigrationManager::new(config),
            compiler: SchemaCompiler::new(dialect),
        }
    }

    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    pub fn compiler(&self) -> &SchemaCompiler {
        &self.compiler
    }

    fn ledger(&self) -> MigrationLedger {
        MigrationLedger::new(
            Arc::clone(self.compiler.dialect()),
            self.manager.config().migrations_table.clone(),
        )
    }

    /// Compile a document from an arbitrary path without touching the database
    pub async fn compile_file(&self, path: &Path, rollback: bool) -> OrmResult<SqlScript> {
        let document = read_document(path).await?;
        self.compiler.compile_schema(&document, rollback)
    }

    /// Apply every pending migration, or only `target`.
    ///
    /// Pending documents are all compiled before the first one executes, and
    /// every file applied in this run shares one batch number.
    pub async fn apply_migrations(
        &self,
        conn: &mut dyn DatabaseConnection,
        target: Option<&str>,
    ) -> OrmResult<MigrationRunResult> {
        let start_time = Instant::now();

        if target.is_none() && !self.manager.directory_exists() {
            tracing::warn!(
                target: "tabula::migrate",
                "No migrations directory at {}",
                self.manager.config().migrations_dir.display()
            );
            return Ok(MigrationRunResult::default());
        }

        let candidates = self.manager.candidates(target).await?;
        let mut ledger = self.ledger();
        ledger.ensure_table(conn).await?;

        let mut result = MigrationRunResult::default();
        let mut pending = Vec::new();
        for file in candidates {
            if ledger.is_applied(conn, &file).await? {
                tracing::info!(target: "tabula::migrate", "Skipping {} (already applied)", file);
                result.skipped_migrations.push(file);
            } else {
                pending.push(file);
            }
        }

        if pending.is_empty() {
            tracing::info!(target: "tabula::migrate", "Nothing to migrate");
            result.execution_time_ms = start_time.elapsed().as_millis();
            return Ok(result);
        }

        let mut scripts = Vec::with_capacity(pending.len());
        for file in pending {
            let document = self.manager.load_document(&file).await?;
            let script = self
                .compiler
                .compile_schema(&document, false)
                .map_err(|e| with_file_context(e, &file))?;
            scripts.push((file, script));
        }

        let batch = ledger.next_batch(conn).await?;
        for (file, script) in scripts {
            tracing::info!(target: "tabula::migrate", "Migrating: {}", file);
            self.execute_file(conn, &mut ledger, &file, &script, LedgerStep::Record(batch))
                .await?;
            tracing::info!(target: "tabula::migrate", "Migrated: {} (batch {})", file, batch);
            result.applied_migrations.push(file);
        }

        result.batch = Some(batch);
        result.execution_time_ms = start_time.elapsed().as_millis();
        Ok(result)
    }

    /// Run the `rollback` section of every applied file, or only `target`.
    ///
    /// Rollback is file-set based, not batch based: files never recorded in the
    /// ledger are skipped with a warning.
    pub async fn rollback_migrations(
        &self,
        conn: &mut dyn DatabaseConnection,
        target: Option<&str>,
    ) -> OrmResult<RollbackResult> {
        let start_time = Instant::now();

        if !self.manager.directory_exists() {
            return Err(OrmError::DirectoryNotFound(
                self.manager.config().migrations_dir.display().to_string(),
            ));
        }

        let candidates = self.manager.candidates(target).await?;
        let mut ledger = self.ledger();
        ledger.ensure_table(conn).await?;

        let mut result = RollbackResult::default();
        let mut scripts = Vec::new();
        for file in candidates {
            if !ledger.is_applied(conn, &file).await? {
                tracing::warn!(target: "tabula::migrate", "Skipping {} (not applied)", file);
                result.skipped_migrations.push(file);
                continue;
            }
            let document = self.manager.load_document(&file).await?;
            let script = self
                .compiler
                .compile_schema(&document, true)
                .map_err(|e| with_file_context(e, &file))?;
            scripts.push((file, script));
        }

        for (file, script) in scripts {
            tracing::info!(target: "tabula::migrate", "Rolling back: {}", file);
            self.execute_file(conn, &mut ledger, &file, &script, LedgerStep::Forget)
                .await?;
            tracing::info!(target: "tabula::migrate", "Rolled back: {}", file);
            result.rolled_back_migrations.push(file);
        }

        result.execution_time_ms = start_time.elapsed().as_millis();
        Ok(result)
    }

    /// Every migration file with its ledger state, in directory order
    pub async fn status(&self, conn: &mut dyn DatabaseConnection) -> OrmResult<Vec<(String, MigrationStatus)>> {
        if !self.manager.directory_exists() {
            return Ok(Vec::new());
        }

        let files = self.manager.list_migrations().await?;
        let mut ledger = self.ledger();
        ledger.ensure_table(conn).await?;

        let entries: HashMap<String, _> = ledger
            .entries(conn)
            .await?
            .into_iter()
            .map(|entry| (entry.migration.clone(), entry))
            .collect();

        Ok(files
            .into_iter()
            .map(|file| {
                let status = match entries.get(&file) {
                    Some(entry) => MigrationStatus::Applied {
                        batch: entry.batch,
                        applied_at: entry.created_at,
                    },
                    None => MigrationStatus::Pending,
                };
                (file, status)
            })
            .collect())
    }

    /// Run one script inside its transaction block and update the ledger before committing
    async fn execute_file(
        &self,
        conn: &mut dyn DatabaseConnection,
        ledger: &mut MigrationLedger,
        file: &str,
        script: &SqlScript,
        step: LedgerStep,
    ) -> OrmResult<()> {
        conn.execute(&script.begin, &[]).await?;

        let mut outcome = Ok(());
        for statement in &script.statements {
            tracing::debug!(target: "tabula::migrate", "{}", statement);
            if let Err(e) = conn.execute(statement, &[]).await {
                outcome = Err(attach_statement(e, statement));
                break;
            }
        }

        if outcome.is_ok() {
            outcome = match step {
                LedgerStep::Record(batch) => ledger.record(conn, file, batch).await,
                LedgerStep::Forget => ledger.forget(conn, file).await.map(|_| ()),
            };
        }

        if let Err(e) = outcome {
            tracing::error!(target: "tabula::migrate", "{} failed: {}", file, e);
            if let Err(rollback_err) = conn.execute(&script.rollback, &[]).await {
                tracing::error!(target: "tabula::migrate", "Rollback of {} failed: {}", file, rollback_err);
            }
            return Err(e);
        }

        conn.execute(&script.commit, &[]).await?;
        Ok(())
    }
}

fn attach_statement(err: OrmError, statement: &str) -> OrmError {
    match err {
        OrmError::SqlExecution { message, statement: None } => OrmError::sql(message, Some(statement)),
        other => other,
    }
}

fn with_file_context(err: OrmError, file: &str) -> OrmError {
    match err {
        OrmError::InvalidDocument(msg) => OrmError::InvalidDocument(format!("{}: {}", file, msg)),
        other => other,
    }
}
