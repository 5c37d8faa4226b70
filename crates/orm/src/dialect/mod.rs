//! SQL Dialects
//!
//! All SQL text produced by the compiler, ledger and seed engine goes through
//! a [`SqlDialect`]. Backends differ in quoting, type names, placeholders,
//! transaction keywords and a handful of DDL clauses.

pub mod mysql;
pub mod postgres;

use std::collections::HashMap;
use std::sync::Arc;

use crate::backends::DatabaseBackendType;
use crate::error::{OrmError, OrmResult};
use crate::migrations::definitions::{ColumnDefinition, CreateTable, DefaultValue, DropTable, ForeignKeyDefinition, IndexDefinition};

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

/// Ordered statements wrapped in a backend-native transaction block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    pub begin: String,
    pub statements: Vec<String>,
    pub commit: String,
    pub rollback: String,
}

impl SqlScript {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

impl std::fmt::Display for SqlScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.begin)?;
        for statement in &self.statements {
            writeln!(f, "{}", statement)?;
        }
        write!(f, "{}", self.commit)
    }
}

/// Where a dropped index ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexDrop {
    /// Clause inside the table's ALTER TABLE
    InAlter(String),
    /// Separate statement after the ALTER TABLE
    Standalone(String),
}

/// Per-backend SQL syntax rules
pub trait SqlDialect: Send + Sync + std::fmt::Debug {
    fn backend_type(&self) -> DatabaseBackendType;

    fn quote_char(&self) -> char;

    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        let escaped = name.replace(q, &format!("{}{}", q, q));
        format!("{}{}{}", q, escaped, q)
    }

    /// Native type for a document type; unknown types pass through verbatim
    fn map_column_type(&self, logical_type: &str) -> String;

    fn format_default(&self, value: &DefaultValue) -> String;

    /// Parameter placeholder, 1-based
    fn placeholder(&self, index: usize) -> String;

    /// Inline form of text with no declared type; `None` binds it instead
    fn untyped_literal(&self, _text: &str) -> Option<String> {
        None
    }

    fn begin_keyword(&self) -> &'static str;

    fn transaction_wrap(&self, statements: Vec<String>) -> SqlScript {
        SqlScript {
            begin: format!("{};", self.begin_keyword()),
            statements,
            commit: "COMMIT;".to_string(),
            rollback: "ROLLBACK;".to_string(),
        }
    }

    fn auto_increment_clause(&self) -> &'static str;

    /// Full column clause as used in CREATE TABLE and ADD COLUMN
    fn column_definition(&self, column: &ColumnDefinition) -> String;

    fn foreign_key_clause(&self, fk: &ForeignKeyDefinition) -> String {
        let mut clause = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(&fk.name),
            self.quote_identifier(&fk.column),
            self.quote_identifier(&fk.reference_table),
            self.quote_identifier(&fk.reference_column),
        );
        if let Some(action) = fk.on_delete {
            clause.push_str(&format!(" ON DELETE {}", action.as_sql()));
        }
        if let Some(action) = fk.on_update {
            clause.push_str(&format!(" ON UPDATE {}", action.as_sql()));
        }
        clause
    }

    /// Trailing table options after the closing parenthesis
    fn table_options(&self, _op: &CreateTable) -> Option<String> {
        None
    }

    fn create_index(&self, table: &str, index: &IndexDefinition) -> String {
        let columns: Vec<String> = index.columns.iter().map(|c| self.quote_identifier(c)).collect();
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.resolved_name(table)),
            self.quote_identifier(table),
            columns.join(", ")
        )
    }

    fn add_column_clause(&self, column: &ColumnDefinition) -> String {
        format!("ADD COLUMN {}", self.column_definition(column))
    }

    fn modify_column_clause(&self, column: &ColumnDefinition) -> String;

    fn drop_column_clause(&self, name: &str) -> String {
        format!("DROP COLUMN {}", self.quote_identifier(name))
    }

    fn add_foreign_key_clause(&self, fk: &ForeignKeyDefinition) -> String {
        format!("ADD {}", self.foreign_key_clause(fk))
    }

    fn drop_foreign_key_clause(&self, name: &str) -> String;

    fn drop_index(&self, table: &str, name: &str) -> IndexDrop;

    fn drop_table(&self, op: &DropTable) -> String;

    /// Insert of a row with no explicit columns
    fn insert_default_values(&self, table: &str) -> String {
        format!("INSERT INTO {} DEFAULT VALUES", self.quote_identifier(table))
    }

    /// One random value of `column` from `table`
    fn random_row_query(&self, table: &str, column: &str) -> String;

    fn ledger_table_sql(&self, table: &str) -> String;

    fn ledger_batch_column_sql(&self, table: &str) -> String;

    fn ledger_add_batch_column_sql(&self, table: &str) -> String {
        format!("ALTER TABLE {} ADD COLUMN batch INT DEFAULT 1 NOT NULL", table)
    }
}

/// Quote a string literal, doubling embedded single quotes
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Dialect registry keyed by backend type
#[derive(Debug, Default)]
pub struct DialectRegistry {
    dialects: HashMap<DatabaseBackendType, Arc<dyn SqlDialect>>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the PostgreSQL and MySQL dialects
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PostgresDialect));
        registry.register(Arc::new(MySqlDialect));
        registry
    }

    pub fn register(&mut self, dialect: Arc<dyn SqlDialect>) {
        self.dialects.insert(dialect.backend_type(), dialect);
    }

    pub fn get(&self, backend: DatabaseBackendType) -> OrmResult<Arc<dyn SqlDialect>> {
        self.dialects
            .get(&backend)
            .cloned()
            .ok_or_else(|| OrmError::UnsupportedDialect(backend.to_string()))
    }

    /// Look a dialect up by backend name, e.g. `pg` or `mysql`
    pub fn resolve(&self, name: &str) -> OrmResult<Arc<dyn SqlDialect>> {
        self.get(name.parse()?)
    }

    pub fn registered_backends(&self) -> Vec<DatabaseBackendType> {
        self.dialects.keys().copied().collect()
    }
}
