//! Migration System
//!
//! JSON migration documents are compiled per dialect, executed one file at a
//! time and tracked in the `migrations` ledger table.

pub mod compiler;
pub mod definitions;
pub mod ledger;
pub mod manager;
pub mod runner;

pub use compiler::{validate_operations, SchemaCompiler};
pub use definitions::*;
pub use ledger::MigrationLedger;
pub use manager::{read_document, MigrationManager};
pub use runner::MigrationDriver;
