use std::path::Path;

use anyhow::Result;
use console::style;
use tabula_orm::migrations::MigrationManager;
use tabula_orm::seeding::SeedManager;

use crate::context::CommandContext;

/// Scaffold a timestamped migration document
pub async fn migration(ctx: &CommandContext, name: &str) -> Result<()> {
    let path = MigrationManager::new(ctx.migration_config()).create_migration(name).await?;
    created("migration", &path);
    Ok(())
}

/// Scaffold a seeder document
pub async fn seeder(ctx: &CommandContext, name: &str) -> Result<()> {
    let path = SeedManager::new(ctx.seed_config()).create_seeder(name).await?;
    created("seeder", &path);
    Ok(())
}

/// Scaffold a factory document
pub async fn factory(ctx: &CommandContext, name: &str) -> Result<()> {
    let path = SeedManager::new(ctx.seed_config()).create_factory(name).await?;
    created("factory", &path);
    Ok(())
}

fn created(kind: &str, path: &Path) {
    println!("{} {} {}", style("Created").green().bold(), kind, path.display());
}
