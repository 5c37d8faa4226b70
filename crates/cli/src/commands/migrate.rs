use std::path::{Path, PathBuf};

use anyhow::Result;
use console::style;
use serde_json::json;
use tabula_orm::migrations::MigrationManager;
use tabula_orm::{MigrationDriver, MigrationStatus};

use crate::context::{close, CommandContext};
use crate::interactive::confirm_bulk;

/// Apply every pending migration, or only `file`
pub async fn run(ctx: &CommandContext, file: Option<&str>) -> Result<()> {
    let driver = MigrationDriver::new(ctx.dialect.clone(), ctx.migration_config());
    let mut conn = ctx.connect().await?;
    let result = driver.apply_migrations(conn.as_mut(), file).await;
    close(conn).await;
    let result = result?;

    if ctx.json {
        println!(
            "{}",
            json!({
                "applied": result.applied_migrations,
                "skipped": result.skipped_migrations,
                "batch": result.batch,
                "execution_time_ms": result.execution_time_ms,
            })
        );
        return Ok(());
    }

    if result.applied_migrations.is_empty() {
        println!("{} Nothing to migrate.", style("•").dim());
        return Ok(());
    }
    for name in &result.applied_migrations {
        println!("{} {}", style("Migrated:").green().bold(), name);
    }
    if let Some(batch) = result.batch {
        println!(
            "{} migration(s) applied in batch {} ({} ms)",
            result.applied_migrations.len(),
            batch,
            result.execution_time_ms
        );
    }
    Ok(())
}

/// Roll back every applied migration, or only `file`
pub async fn rollback(ctx: &CommandContext, file: Option<&str>, force: bool) -> Result<()> {
    if file.is_none() && !confirm_bulk("Roll back", &ctx.migrations_dir(), force)? {
        return Ok(());
    }

    let driver = MigrationDriver::new(ctx.dialect.clone(), ctx.migration_config());
    let mut conn = ctx.connect().await?;
    let result = driver.rollback_migrations(conn.as_mut(), file).await;
    close(conn).await;
    let result = result?;

    if ctx.json {
        println!(
            "{}",
            json!({
                "rolled_back": result.rolled_back_migrations,
                "skipped": result.skipped_migrations,
                "execution_time_ms": result.execution_time_ms,
            })
        );
        return Ok(());
    }

    if result.rolled_back_migrations.is_empty() {
        println!("{} Nothing to roll back.", style("•").dim());
    }
    for name in &result.rolled_back_migrations {
        println!("{} {}", style("Rolled back:").yellow().bold(), name);
    }
    for name in &result.skipped_migrations {
        println!("{} {} (not applied)", style("Skipped:").dim(), name);
    }
    Ok(())
}

/// Print every migration file with its ledger state
pub async fn status(ctx: &CommandContext) -> Result<()> {
    let driver = MigrationDriver::new(ctx.dialect.clone(), ctx.migration_config());
    let mut conn = ctx.connect().await?;
    let entries = driver.status(conn.as_mut()).await;
    close(conn).await;
    let entries = entries?;

    if ctx.json {
        let rows: Vec<_> = entries
            .iter()
            .map(|(name, status)| match status {
                MigrationStatus::Pending => json!({"migration": name, "status": "pending"}),
                MigrationStatus::Applied { batch, applied_at } => json!({
                    "migration": name,
                    "status": "applied",
                    "batch": batch,
                    "applied_at": applied_at.map(|t| t.to_rfc3339()),
                }),
            })
            .collect();
        println!("{}", serde_json::Value::Array(rows));
        return Ok(());
    }

    if entries.is_empty() {
        println!("No migrations found in {}", ctx.migrations_dir().display());
        return Ok(());
    }

    println!("{}", style(format!("Migration status ({})", ctx.backend)).bold().cyan());
    for (name, status) in &entries {
        match status {
            MigrationStatus::Pending => println!("  {}  {}", style("Pending").yellow(), name),
            MigrationStatus::Applied { batch, .. } => {
                println!("  {}  {} (batch {})", style("Applied").green(), name, batch)
            }
        }
    }
    Ok(())
}

/// Print the SQL a document compiles to without touching the database
pub async fn compile(ctx: &CommandContext, file: &str, rollback: bool) -> Result<()> {
    let driver = MigrationDriver::new(ctx.dialect.clone(), ctx.migration_config());
    let path = document_path(&ctx.migrations_dir(), file);
    let script = driver.compile_file(&path, rollback).await?;

    if ctx.json {
        println!(
            "{}",
            json!({
                "file": path.display().to_string(),
                "rollback": rollback,
                "begin": script.begin,
                "statements": script.statements,
                "commit": script.commit,
            })
        );
    } else {
        println!("{}", script);
    }
    Ok(())
}

/// A path as given when it exists, otherwise a file in the migrations directory
fn document_path(migrations_dir: &Path, file: &str) -> PathBuf {
    let given = PathBuf::from(file);
    if given.is_file() {
        return given;
    }
    migrations_dir.join(MigrationManager::resolve_target(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path_resolution() {
        let dir = tempfile::TempDir::new().unwrap();
        let existing = dir.path().join("doc.json");
        std::fs::write(&existing, "{}").unwrap();

        assert_eq!(document_path(Path::new("db/migrations/pg"), existing.to_str().unwrap()), existing);
        assert_eq!(
            document_path(Path::new("db/migrations/pg"), "20240101000000_users"),
            PathBuf::from("db/migrations/pg/20240101000000_users.json")
        );
    }
}
