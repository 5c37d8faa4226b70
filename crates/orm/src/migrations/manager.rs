//! Migration Manager - File system operations for migrations
//!
//! Handles creating, listing, and parsing migration documents.

use std::path::{Path, PathBuf};

use chrono::Utc;
use regex::Regex;

use crate::error::{OrmError, OrmResult};
use super::definitions::{MigrationConfig, MigrationDocument};

const MIGRATION_TEMPLATE: &str = r#"{
  "migrations": [
    {
      "action": "",
      "table": "",
      "columns": [],
      "indexes": [],
      "foreignKeys": []
    }
  ],
  "rollback": [
    {
      "action": "",
      "table": "",
      "dropIfExists": true,
      "ignoreForeignAndCascade": true
    }
  ]
}
"#;

/// Migration manager for creating and loading migration documents
#[derive(Debug, Clone)]
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    pub fn new(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn directory_exists(&self) -> bool {
        self.config.migrations_dir.is_dir()
    }

    /// Create a new migration document from the template
    pub async fn create_migration(&self, name: &str) -> OrmResult<PathBuf> {
        tokio::fs::create_dir_all(&self.config.migrations_dir).await?;

        let filename = format!(
            "{}_{}.json",
            Utc::now().format("%Y%m%d%H%M%S"),
            name.trim().replace(' ', "_").to_lowercase()
        );
        let path = self.config.migrations_dir.join(filename);
        tokio::fs::write(&path, MIGRATION_TEMPLATE).await?;

        tracing::info!(target: "tabula::migrate", "Created migration {}", path.display());
        Ok(path)
    }

    /// All migration filenames, sorted and then reversed.
    ///
    /// Only `.json` files are considered; a missing directory is an error.
    pub async fn list_migrations(&self) -> OrmResult<Vec<String>> {
        let dir = &self.config.migrations_dir;
        if !dir.is_dir() {
            return Err(OrmError::DirectoryNotFound(dir.display().to_string()));
        }

        let timestamped = Regex::new(r"^\d{14}_.+\.json$")
            .map_err(|e| OrmError::InvalidDocument(e.to_string()))?;

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !name.ends_with(".json") {
                continue;
            }
            if !timestamped.is_match(&name) {
                tracing::warn!(target: "tabula::migrate", "{} has no 14-digit timestamp prefix", name);
            }
            files.push(name);
        }

        files.sort();
        files.reverse();
        Ok(files)
    }

    /// Candidate files for a run: the named target, or the whole directory listing
    pub async fn candidates(&self, target: Option<&str>) -> OrmResult<Vec<String>> {
        match target {
            Some(target) => Ok(vec![Self::resolve_target(target)]),
            None => self.list_migrations().await,
        }
    }

    /// Append `.json` to a target name given without extension
    pub fn resolve_target(target: &str) -> String {
        if target.ends_with(".json") {
            target.to_string()
        } else {
            format!("{}.json", target)
        }
    }

    /// Read and parse one migration document from the migrations directory
    pub async fn load_document(&self, filename: &str) -> OrmResult<MigrationDocument> {
        read_document(&self.config.migrations_dir.join(filename)).await
    }
}

/// Read and parse a migration document from any path
pub async fn read_document(path: &Path) -> OrmResult<MigrationDocument> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OrmError::InvalidDocument(format!("migration file {} not found", path.display()))
        } else {
            OrmError::Io(e)
        }
    })?;

    serde_json::from_str(&content)
        .map_err(|e| OrmError::InvalidDocument(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> MigrationManager {
        MigrationManager::new(MigrationConfig::new(dir.path()))
    }

    #[tokio::test]
    async fn test_listing_is_reverse_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["20240101000000_a.json", "20240301000000_c.json", "20240201000000_b.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }

        let files = manager(&dir).list_migrations().await.unwrap();
        assert_eq!(
            files,
            vec!["20240301000000_c.json", "20240201000000_b.json", "20240101000000_a.json"]
        );
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(MigrationConfig::new(dir.path().join("pg")));

        assert!(!manager.directory_exists());
        assert!(matches!(
            manager.list_migrations().await,
            Err(OrmError::DirectoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_target_resolution() {
        let dir = TempDir::new().unwrap();
        let candidates = manager(&dir).candidates(Some("20240101000000_users")).await.unwrap();
        assert_eq!(candidates, vec!["20240101000000_users.json"]);
        assert_eq!(MigrationManager::resolve_target("x.json"), "x.json");
    }

    #[tokio::test]
    async fn test_created_migration_parses() {
        let dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(MigrationConfig::new(dir.path().join("mysql")));

        let path = manager.create_migration("Create Users").await.unwrap();
        let filename = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(filename.ends_with("_create_users.json"));
        assert_eq!(filename.len(), "20240101000000_create_users.json".len());

        // the template's empty action is not a known variant
        assert!(matches!(
            manager.load_document(&filename).await,
            Err(OrmError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn test_load_document_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = manager(&dir).load_document("20240101000000_nope.json").await.unwrap_err();
        assert!(matches!(err, OrmError::InvalidDocument(msg) if msg.contains("not found")));
    }
}
