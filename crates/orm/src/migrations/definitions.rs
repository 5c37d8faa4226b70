//! Migration Definitions - Core types and structures for migrations
//!
//! The JSON migration document model (change operations, columns, keys and
//! indexes) plus the ledger records and run results built around it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use crate::error::{OrmError, OrmResult};

/// One schema change, tagged by its `action` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ChangeOperation {
    Create(CreateTable),
    Alter(AlterTable),
    Drop(DropTable),
}

impl ChangeOperation {
    /// Target table of the operation
    pub fn table(&self) -> &str {
        match self {
            ChangeOperation::Create(op) => &op.table,
            ChangeOperation::Alter(op) => &op.table,
            ChangeOperation::Drop(op) => &op.table,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            ChangeOperation::Create(_) => "create",
            ChangeOperation::Alter(_) => "alter",
            ChangeOperation::Drop(_) => "drop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTable {
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    /// MySQL storage engine, e.g. `InnoDB`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// MySQL default character set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterTable {
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub changes: TableChanges,
}

/// Column and constraint changes folded into a single ALTER TABLE
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableChanges {
    #[serde(default)]
    pub add: Vec<ColumnDefinition>,
    #[serde(default)]
    pub modify: Vec<ColumnDefinition>,
    #[serde(default)]
    pub drop: Vec<String>,
    #[serde(default)]
    pub add_foreign_keys: Vec<ForeignKeyDefinition>,
    #[serde(default)]
    pub drop_foreign_keys: Vec<String>,
    #[serde(default)]
    pub drop_index: Vec<String>,
}

impl TableChanges {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.modify.is_empty()
            && self.drop.is_empty()
            && self.add_foreign_keys.is_empty()
            && self.drop_foreign_keys.is_empty()
            && self.drop_index.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTable {
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub drop_if_exists: bool,
    #[serde(default)]
    pub ignore_foreign_and_cascade: bool,
}

/// A column as written in a migration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub unsigned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            primary_key: false,
            auto_increment: false,
            unique: false,
            unsigned: false,
            nullable: None,
            default: None,
        }
    }

    /// Only an explicit `nullable: false` produces NOT NULL
    pub fn is_not_null(&self) -> bool {
        self.nullable == Some(false)
    }
}

/// Column default: a literal or a timestamp marker resolved per dialect.
///
/// Accepted forms: `"text"`, `42`, `true`, `"CURRENT_TIMESTAMP"`,
/// `{"value": "CURRENT_TIMESTAMP"}`, `{"value": "text"}` and
/// `{"function": "ON_UPDATE_TIMESTAMP"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "JsonValue", into = "JsonValue")]
pub enum DefaultValue {
    CurrentTimestamp,
    OnUpdateTimestamp,
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl TryFrom<JsonValue> for DefaultValue {
    type Error = String;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::String(s) => Ok(match s.to_uppercase().as_str() {
                "CURRENT_TIMESTAMP" => DefaultValue::CurrentTimestamp,
                "ON_UPDATE_TIMESTAMP" => DefaultValue::OnUpdateTimestamp,
                _ => DefaultValue::Text(s),
            }),
            JsonValue::Number(n) => Ok(DefaultValue::Number(n)),
            JsonValue::Bool(b) => Ok(DefaultValue::Bool(b)),
            JsonValue::Object(mut map) => {
                let function = map.get("function").and_then(JsonValue::as_str).map(str::to_uppercase);
                if function.as_deref() == Some("ON_UPDATE_TIMESTAMP") {
                    return Ok(DefaultValue::OnUpdateTimestamp);
                }
                match map.remove("value") {
                    Some(inner @ (JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_))) => {
                        DefaultValue::try_from(inner)
                    }
                    _ => Err("default object needs a scalar `value` or `function: ON_UPDATE_TIMESTAMP`".to_string()),
                }
            }
            other => Err(format!("unsupported default value: {}", other)),
        }
    }
}

impl From<DefaultValue> for JsonValue {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::CurrentTimestamp => JsonValue::String("CURRENT_TIMESTAMP".to_string()),
            DefaultValue::OnUpdateTimestamp => serde_json::json!({ "function": "ON_UPDATE_TIMESTAMP" }),
            DefaultValue::Text(s) => JsonValue::String(s),
            DefaultValue::Number(n) => JsonValue::Number(n),
            DefaultValue::Bool(b) => JsonValue::Bool(b),
        }
    }
}

/// Foreign key constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDefinition {
    pub name: String,
    pub column: String,
    pub reference_table: String,
    pub reference_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

impl TryFrom<String> for ReferentialAction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_uppercase().replace('_', " ");
        match normalized.as_str() {
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "SET DEFAULT" => Ok(ReferentialAction::SetDefault),
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "NO ACTION" => Ok(ReferentialAction::NoAction),
            _ => Err(format!("unknown referential action '{}'", value)),
        }
    }
}

impl From<ReferentialAction> for String {
    fn from(value: ReferentialAction) -> Self {
        value.as_sql().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    /// Declared name, or `idx_<table>_<columns>`
    pub fn resolved_name(&self, table: &str) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("idx_{}_{}", table, self.columns.join("_")),
        }
    }
}

/// A parsed migration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations: Option<Vec<ChangeOperation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<Vec<ChangeOperation>>,
}

impl MigrationDocument {
    pub fn from_json(content: &str) -> OrmResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Operations for one direction; a missing section is a document error
    pub fn operations(&self, direction: MigrationDirection) -> OrmResult<&[ChangeOperation]> {
        let (ops, key) = match direction {
            MigrationDirection::Up => (&self.migrations, "migrations"),
            MigrationDirection::Down => (&self.rollback, "rollback"),
        };
        ops.as_deref()
            .ok_or_else(|| OrmError::InvalidDocument(format!("`{}` key not defined in migration document", key)))
    }
}

/// One row of the migrations ledger table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub migration: String,
    pub batch: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
}

impl MigrationConfig {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("database/migrations"),
            migrations_table: "migrations".to_string(),
        }
    }
}

/// Result of running migrations
#[derive(Debug, Default)]
pub struct MigrationRunResult {
    /// Files applied in this run, in execution order
    pub applied_migrations: Vec<String>,
    /// Files found in the ledger and skipped
    pub skipped_migrations: Vec<String>,
    /// Batch shared by every file applied in this run
    pub batch: Option<i64>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of rolling back migrations
#[derive(Debug, Default)]
pub struct RollbackResult {
    pub rolled_back_migrations: Vec<String>,
    /// Files that were never applied
    pub skipped_migrations: Vec<String>,
    pub execution_time_ms: u128,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run `migrations` operations)
    Up,
    /// Rollback the migration (run `rollback` operations)
    Down,
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    Pending,
    Applied {
        batch: i64,
        applied_at: Option<DateTime<Utc>>,
    },
}
