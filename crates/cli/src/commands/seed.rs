use anyhow::{bail, Result};
use console::style;
use serde_json::json;
use tabula_orm::SeedDriver;

use crate::context::{close, CommandContext};
use crate::interactive::confirm_bulk;

/// Run every seeder, or only `file`
pub async fn run(ctx: &CommandContext, file: Option<&str>, force: bool) -> Result<()> {
    if ctx.config.environment.is_production() && !force {
        bail!(
            "Environment '{}' requires an explicit --force flag for seeding",
            ctx.config.environment
        );
    }
    if file.is_none() && !confirm_bulk("Seed", &ctx.seeders_dir(), force)? {
        return Ok(());
    }

    let mut driver = SeedDriver::new(ctx.dialect.clone(), ctx.seed_config());
    let mut conn = ctx.connect().await?;
    let summary = driver.run_seeds(conn.as_mut(), file).await;
    close(conn).await;
    let summary = summary?;

    if ctx.json {
        println!(
            "{}",
            json!({
                "files": summary.files,
                "specs_run": summary.specs_run,
                "specs_skipped": summary.specs_skipped,
                "rows_inserted": summary.rows_inserted,
                "rows_updated": summary.rows_updated,
                "custom_queries": summary.custom_queries,
            })
        );
        return Ok(());
    }

    println!(
        "{} {} file(s), {} spec(s): {} inserted, {} updated, {} custom quer{}",
        style("Seeded:").green().bold(),
        summary.files,
        summary.specs_run,
        summary.rows_inserted,
        summary.rows_updated,
        summary.custom_queries,
        if summary.custom_queries == 1 { "y" } else { "ies" }
    );
    if summary.specs_skipped > 0 {
        println!(
            "{} {} spec(s) skipped, see the log for details",
            style("Warning:").yellow().bold(),
            summary.specs_skipped
        );
    }
    Ok(())
}
