//! Seed Manager - File system operations for seeders and factories

use std::path::{Path, PathBuf};

use crate::error::{OrmError, OrmResult};
use crate::factory::FactoryDocument;
use super::definitions::{SeedConfig, SeedDocument};

const SEEDER_TEMPLATE: &str = r#"{
  "seed": [
    {
      "table": "sites",
      "factory": "factoryName",
      "execution_count": 10,
      "custom_query": null,
      "custom_query_execution_count": 0
    }
  ]
}
"#;

const FACTORY_TEMPLATE: &str = r#"{
  "columns": [
    {
      "col_name": {
        "fake": true,
        "type": "number|string|longtext|alphanumeric|float|...",
        "custom": ""
      }
    }
  ]
}
"#;

#[derive(Debug, Clone)]
pub struct SeedManager {
    config: SeedConfig,
}

impl SeedManager {
    pub fn new(config: SeedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Seeder files to run, in ascending name order.
    ///
    /// A named target that does not exist yields an empty list.
    pub async fn seeder_files(&self, target: Option<&str>) -> OrmResult<Vec<PathBuf>> {
        let dir = &self.config.seeders_dir;
        if !dir.is_dir() {
            return Err(OrmError::DirectoryNotFound(dir.display().to_string()));
        }

        if let Some(target) = target {
            let name = if target.ends_with(".json") {
                target.to_string()
            } else {
                format!("{}.json", target)
            };
            let path = dir.join(name);
            if !path.is_file() {
                tracing::warn!(target: "tabula::seed", "Seeder {} not found", path.display());
                return Ok(Vec::new());
            }
            return Ok(vec![path]);
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub async fn load_seeder(&self, path: &Path) -> OrmResult<SeedDocument> {
        let content = tokio::fs::read_to_string(path).await?;
        SeedDocument::from_json(&content)
            .map_err(|e| OrmError::InvalidDocument(format!("{}: {}", path.display(), e)))
    }

    pub fn factory_path(&self, name: &str) -> PathBuf {
        self.config.factories_dir.join(format!("{}.json", name))
    }

    /// Load a factory by name; `None` when the file does not exist
    pub async fn load_factory(&self, name: &str) -> OrmResult<Option<FactoryDocument>> {
        let path = self.factory_path(name);
        if !path.is_file() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        FactoryDocument::from_json(&content)
            .map(Some)
            .map_err(|e| OrmError::InvalidDocument(format!("{}: {}", path.display(), e)))
    }

    /// Write a seeder template named `<name>.json`
    pub async fn create_seeder(&self, name: &str) -> OrmResult<PathBuf> {
        create_from_template(&self.config.seeders_dir, name, SEEDER_TEMPLATE).await
    }

    /// Write a factory template named `<name>.json`
    pub async fn create_factory(&self, name: &str) -> OrmResult<PathBuf> {
        create_from_template(&self.config.factories_dir, name, FACTORY_TEMPLATE).await
    }
}

async fn create_from_template(dir: &Path, name: &str, template: &str) -> OrmResult<PathBuf> {
    if !dir.is_dir() {
        tokio::fs::create_dir_all(dir).await?;
        tracing::info!(target: "tabula::seed", "Created directory {}", dir.display());
    }

    let path = dir.join(format!("{}.json", name.trim()));
    tokio::fs::write(&path, template).await?;
    tracing::info!(target: "tabula::seed", "Created {}", path.display());
    Ok(path)
}
