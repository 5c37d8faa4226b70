//! # tabula-orm: Migration compiler, ledger and seed engine
//!
//! Schema changes are hand-written JSON documents compiled into PostgreSQL or
//! MySQL DDL, applied in order and tracked in a `migrations` ledger table.
//! Seeder and factory documents populate tables with generated, literal or
//! referenced values.
//!
//! Everything runs against a caller-supplied [`DatabaseConnection`]; the crate
//! never opens connections on its own except through [`backends::connect`].

pub mod backends;
pub mod dialect;
pub mod error;
pub mod factory;
pub mod migrations;
pub mod seeding;
pub mod testing;

// Re-export core traits and types
pub use backends::{connect, DatabaseBackendType, DatabaseConnection, DatabaseRow, DatabaseValue, ValueRow};
pub use dialect::{DialectRegistry, MySqlDialect, PostgresDialect, SqlDialect, SqlScript};
pub use error::{OrmError, OrmResult};
pub use factory::{FakeValueGenerator, ReferenceResolver, ValueGenerator};
pub use migrations::{
    MigrationConfig, MigrationDocument, MigrationDriver, MigrationLedger, MigrationRunResult, MigrationStatus,
    RollbackResult, SchemaCompiler,
};
pub use seeding::{SeedConfig, SeedDriver, SeedEngine, SeedSummary};
