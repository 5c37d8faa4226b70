//! Database Seeding
//!
//! Seeder documents name a table, a factory and a row count; the engine
//! generates each row and inserts it, or updates the matching row when the
//! spec carries `createOrUpdate`.

pub mod definitions;
pub mod engine;
pub mod manager;
pub mod runner;

pub use definitions::{CreateOrUpdate, CustomQuery, MatchOperator, SeedConfig, SeedDocument, SeedSpec, SeedSummary};
pub use engine::{BoundStatement, SeedEngine, SeedRow, WriteOutcome};
pub use manager::SeedManager;
pub use runner::SeedDriver;
