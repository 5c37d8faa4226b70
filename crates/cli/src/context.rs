use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tabula_core::AppConfig;
use tabula_orm::{
    connect, DatabaseBackendType, DatabaseConnection, DialectRegistry, MigrationConfig, SeedConfig, SqlDialect,
};

/// Everything a command needs: settings, the selected backend and where documents live
pub struct CommandContext {
    pub config: AppConfig,
    pub backend: DatabaseBackendType,
    pub dialect: Arc<dyn SqlDialect>,
    pub root: PathBuf,
    pub json: bool,
}

impl CommandContext {
    /// `db` falls back to `DEFAULT_DB_TYPE`, `root` to `DATABASE_DIR`
    pub fn new(config: AppConfig, db: Option<&str>, root: Option<&Path>, json: bool) -> Result<Self> {
        let kind = db.unwrap_or(&config.default_db);
        let backend: DatabaseBackendType = kind.parse()?;
        let dialect = DialectRegistry::with_defaults().get(backend)?;
        let root = root
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&config.database_dir));

        Ok(Self {
            config,
            backend,
            dialect,
            root,
            json,
        })
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.root.join("migrations").join(self.backend.dir_name())
    }

    pub fn seeders_dir(&self) -> PathBuf {
        self.root.join("seeders").join(self.backend.dir_name())
    }

    pub fn factories_dir(&self) -> PathBuf {
        self.root.join("factory")
    }

    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig::new(self.migrations_dir())
    }

    pub fn seed_config(&self) -> SeedConfig {
        SeedConfig::new(self.seeders_dir(), self.factories_dir())
    }

    /// Open the one connection this process uses
    pub async fn connect(&self) -> Result<Box<dyn DatabaseConnection>> {
        let url = self.config.database(self.backend.dir_name())?.url()?;
        Ok(connect(self.backend, &url).await?)
    }
}

/// Close the connection, logging instead of failing the command
pub async fn close(mut conn: Box<dyn DatabaseConnection>) {
    if let Err(e) = conn.close().await {
        tracing::warn!(target: "tabula::db", "Closing connection failed: {}", e);
    }
}
