//! Error types for the migration and seeding engine
//!
//! Every fallible operation in the crate returns [`OrmResult`]. Callers decide
//! how a failure ends the run; nothing in here terminates the process.

use thiserror::Error;

/// ORM result type alias
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for compiler, ledger and seeding operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Malformed document or missing required field
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Backend name without a registered dialect
    #[error("Unsupported database dialect: {0}")]
    UnsupportedDialect(String),

    /// The connection could not be opened or is gone
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// A statement was rejected by the backend
    #[error("SQL execution failed: {message}")]
    SqlExecution {
        message: String,
        statement: Option<String>,
    },

    /// A manipulation regex did not compile
    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// A reference lookup found no rows
    #[error("No rows available in {table}.{column}")]
    EmptyReference { table: String, column: String },

    /// Several match columns were given without AND/OR
    #[error("createOrUpdate on table '{0}' has multiple match columns but no operator")]
    MissingOperator(String),

    /// An expected documents directory does not exist
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrmError {
    /// Build an execution error from a backend failure
    pub fn sql(message: impl Into<String>, statement: Option<&str>) -> Self {
        OrmError::SqlExecution {
            message: message.into(),
            statement: statement.map(str::to_string),
        }
    }

    /// Recoverable errors are logged and the run continues
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OrmError::InvalidRegex { .. } | OrmError::EmptyReference { .. }
        )
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::InvalidDocument(err.to_string())
    }
}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => OrmError::ConnectionUnavailable(err.to_string()),
            other => OrmError::sql(other.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let regex = OrmError::InvalidRegex {
            pattern: "(".to_string(),
            message: "unclosed group".to_string(),
        };
        let empty = OrmError::EmptyReference {
            table: "users".to_string(),
            column: "id".to_string(),
        };

        assert!(regex.is_recoverable());
        assert!(empty.is_recoverable());
        assert!(!OrmError::MissingOperator("users".to_string()).is_recoverable());
        assert!(!OrmError::sql("syntax error", Some("SELEC 1")).is_recoverable());
    }

    #[test]
    fn test_json_errors_become_invalid_document() {
        let err: OrmError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, OrmError::InvalidDocument(_)));
    }
}
