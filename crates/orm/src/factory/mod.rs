//! Factory System
//!
//! Factory documents describe how each column of a seeded row is produced:
//! generated from a type tag, taken literally, sampled from another table,
//! then optionally rewritten with a regex.

pub mod definitions;
pub mod fake_data;
pub mod manipulation;
pub mod reference;

pub use definitions::{ColumnGenRule, CustomValue, FactoryDocument, Manipulation, TableReference};
pub use fake_data::{FakeValueGenerator, ValueGenerator};
pub use manipulation::{apply_manipulation, compile_pattern};
pub use reference::ReferenceResolver;
