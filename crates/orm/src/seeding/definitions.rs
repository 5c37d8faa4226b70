//! Seed document model

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};
use crate::factory::FactoryDocument;

/// `{ "seed": [ SeedSpec, ... ] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedDocument {
    pub seed: Vec<SeedSpec>,
}

impl SeedDocument {
    pub fn from_json(content: &str) -> OrmResult<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// One population job for a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedSpec {
    #[serde(default)]
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    #[serde(default)]
    pub execution_count: u64,
    #[serde(rename = "createOrUpdate", default, skip_serializing_if = "Option::is_none")]
    pub create_or_update: Option<CreateOrUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomQuery>,
    /// Older seeders spell the custom query as two flat keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_query_execution_count: Option<u64>,
}

impl SeedSpec {
    /// The custom query to run after the rows, from either spelling
    pub fn custom_query(&self) -> Option<CustomQuery> {
        let custom = self.custom.clone().or_else(|| {
            self.custom_query.as_ref().map(|query| CustomQuery {
                query: query.clone(),
                execution_count: self.custom_query_execution_count.unwrap_or(0),
            })
        })?;

        if custom.query.trim().is_empty() || custom.execution_count == 0 {
            None
        } else {
            Some(custom)
        }
    }

    /// Match columns when rows are upserted; `None` means plain inserts
    pub fn upsert(&self) -> Option<&CreateOrUpdate> {
        self.create_or_update
            .as_ref()
            .filter(|c| !c.match_columns.is_empty())
    }

    /// Checks that must pass before any row is written
    pub fn validate(&self, factory: Option<&FactoryDocument>) -> OrmResult<()> {
        if self.execution_count > 0 && self.table.trim().is_empty() {
            return Err(OrmError::InvalidDocument(
                "seed entry with execution_count > 0 has no table".to_string(),
            ));
        }

        if let Some(upsert) = self.upsert() {
            if upsert.match_columns.len() > 1 && upsert.operator.is_none() {
                return Err(OrmError::MissingOperator(self.table.clone()));
            }
            if let Some(factory) = factory {
                if let Some(missing) = upsert.match_columns.iter().find(|c| !factory.has_column(c)) {
                    return Err(OrmError::InvalidDocument(format!(
                        "match column '{}' of table '{}' is not produced by factory '{}'",
                        missing,
                        self.table,
                        self.factory.as_deref().unwrap_or_default()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Update-else-insert keyed by match columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrUpdate {
    #[serde(rename = "matchColumns", default)]
    pub match_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<MatchOperator>,
}

/// How several match columns are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MatchOperator {
    And,
    Or,
}

impl MatchOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            MatchOperator::And => "AND",
            MatchOperator::Or => "OR",
        }
    }
}

impl TryFrom<String> for MatchOperator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_uppercase().as_str() {
            "AND" => Ok(MatchOperator::And),
            "OR" => Ok(MatchOperator::Or),
            other => Err(format!("unknown match operator '{}', expected AND or OR", other)),
        }
    }
}

impl From<MatchOperator> for String {
    fn from(value: MatchOperator) -> Self {
        value.as_sql().to_string()
    }
}

/// Operator-authored SQL run verbatim after the rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomQuery {
    pub query: String,
    #[serde(default)]
    pub execution_count: u64,
}

/// Locations of seeder and factory documents
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub seeders_dir: PathBuf,
    pub factories_dir: PathBuf,
}

impl SeedConfig {
    pub fn new(seeders_dir: impl Into<PathBuf>, factories_dir: impl Into<PathBuf>) -> Self {
        Self {
            seeders_dir: seeders_dir.into(),
            factories_dir: factories_dir.into(),
        }
    }
}

/// Totals for a seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub files: usize,
    pub specs_run: usize,
    pub specs_skipped: usize,
    pub rows_inserted: u64,
    pub rows_updated: u64,
    pub custom_queries: u64,
}

impl SeedSummary {
    pub fn merge(&mut self, other: &SeedSummary) {
        self.files += other.files;
        self.specs_run += other.specs_run;
        self.specs_skipped += other.specs_skipped;
        self.rows_inserted += other.rows_inserted;
        self.rows_updated += other.rows_updated;
        self.custom_queries += other.custom_queries;
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_inserted + self.rows_updated
    }
}
