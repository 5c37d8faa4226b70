//! Seed Driver - Runs seeder documents against the database
//!
//! Rows are written one statement at a time with no spanning transaction, so
//! a failure keeps every row written before it.

use std::sync::Arc;

use crate::backends::DatabaseConnection;
use crate::dialect::SqlDialect;
use crate::error::OrmResult;
use crate::factory::ValueGenerator;
use super::definitions::{SeedConfig, SeedSummary};
use super::engine::SeedEngine;
use super::manager::SeedManager;

#[derive(Debug)]
pub struct SeedDriver {
    manager: SeedManager,
    engine: SeedEngine,
}

impl SeedDriver {
    pub fn new(dialect: Arc<dyn SqlDialect>, config: SeedConfig) -> Self {
        Self {
            manager: SeedManager::new(config),
            engine: SeedEngine::new(dialect),
        }
    }

    pub fn with_generator(dialect: Arc<dyn SqlDialect>, config: SeedConfig, generator: Box<dyn ValueGenerator>) -> Self {
        Self {
            manager: SeedManager::new(config),
            engine: SeedEngine::with_generator(dialect, generator),
        }
    }

    pub fn manager(&self) -> &SeedManager {
        &self.manager
    }

    /// Run every seeder in the directory, or only `target`
    pub async fn run_seeds(
        &mut self,
        conn: &mut dyn DatabaseConnection,
        target: Option<&str>,
    ) -> OrmResult<SeedSummary> {
        let files = self.manager.seeder_files(target).await?;
        let mut summary = SeedSummary::default();

        for path in files {
            let document = self.manager.load_seeder(&path).await?;
            tracing::info!(target: "tabula::seed", "Seeding: {}", path.display());

            for spec in &document.seed {
                let factory = match spec.factory.as_deref().filter(|f| !f.is_empty()) {
                    Some(name) => match self.manager.load_factory(name).await? {
                        Some(factory) => Some(factory),
                        None => {
                            tracing::error!(
                                target: "tabula::seed",
                                "Factory file not found at {}",
                                self.manager.factory_path(name).display()
                            );
                            summary.specs_skipped += 1;
                            continue;
                        }
                    },
                    None => None,
                };

                let spec_summary = self.engine.run(conn, spec, factory.as_ref()).await?;
                summary.merge(&spec_summary);
                summary.specs_run += 1;
            }

            summary.files += 1;
        }

        tracing::info!(
            target: "tabula::seed",
            "Seeders completed: {} file(s), {} row(s) written",
            summary.files,
            summary.rows_written()
        );
        Ok(summary)
    }
}
