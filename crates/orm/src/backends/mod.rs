//! Database Backend Abstractions
//!
//! Connection capability shared by the migration and seeding engines, with
//! sqlx-backed implementations for PostgreSQL and MySQL.

pub mod core;
pub mod mysql;
pub mod postgres;

// Re-export core traits and types
pub use core::*;
pub use mysql::MySqlDatabaseConnection;
pub use postgres::PostgresConnection;

use crate::error::{OrmError, OrmResult};

/// Database backend type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    PostgreSQL,
    MySQL,
}

impl DatabaseBackendType {
    /// Short name used for per-backend document directories
    pub fn dir_name(&self) -> &'static str {
        match self {
            DatabaseBackendType::PostgreSQL => "pg",
            DatabaseBackendType::MySQL => "mysql",
        }
    }

    /// URL scheme understood by sqlx
    pub fn url_scheme(&self) -> &'static str {
        match self {
            DatabaseBackendType::PostgreSQL => "postgres",
            DatabaseBackendType::MySQL => "mysql",
        }
    }
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::PostgreSQL => write!(f, "postgresql"),
            DatabaseBackendType::MySQL => write!(f, "mysql"),
        }
    }
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pg" | "postgresql" | "postgres" => Ok(DatabaseBackendType::PostgreSQL),
            "mysql" => Ok(DatabaseBackendType::MySQL),
            _ => Err(OrmError::UnsupportedDialect(s.to_string())),
        }
    }
}

/// Open a single connection for the given backend
pub async fn connect(backend: DatabaseBackendType, database_url: &str) -> OrmResult<Box<dyn DatabaseConnection>> {
    tracing::debug!(target: "tabula::db", "Opening {} connection", backend);

    let conn: Box<dyn DatabaseConnection> = match backend {
        DatabaseBackendType::PostgreSQL => Box::new(PostgresConnection::connect(database_url).await?),
        DatabaseBackendType::MySQL => Box::new(MySqlDatabaseConnection::connect(database_url).await?),
    };

    tracing::info!(target: "tabula::db", "{} connected", backend);
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!("pg".parse::<DatabaseBackendType>().unwrap(), DatabaseBackendType::PostgreSQL);
        assert_eq!("Postgres".parse::<DatabaseBackendType>().unwrap(), DatabaseBackendType::PostgreSQL);
        assert_eq!("mysql".parse::<DatabaseBackendType>().unwrap(), DatabaseBackendType::MySQL);
    }

    #[test]
    fn test_unknown_backend_is_unsupported_dialect() {
        for name in ["mongodb", "sqlite", ""] {
            let err = name.parse::<DatabaseBackendType>().unwrap_err();
            assert!(matches!(err, OrmError::UnsupportedDialect(_)));
        }
    }

    #[test]
    fn test_dir_names() {
        assert_eq!(DatabaseBackendType::PostgreSQL.dir_name(), "pg");
        assert_eq!(DatabaseBackendType::MySQL.dir_name(), "mysql");
    }
}
