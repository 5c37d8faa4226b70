//! Seed Engine - Row generation and insert/upsert statements
//!
//! Each column value is resolved with a fixed priority: generated fake value,
//! literal `custom`, `reference_table` lookup, then NULL. NULL values are
//! written inline rather than bound, so no typed null parameter is needed.
//! Literal and referenced text carries no declared type: the dialect may
//! inline it so the server coerces it to the column (dates, numerics).

use std::sync::Arc;

use crate::backends::{DatabaseConnection, DatabaseValue};
use crate::dialect::SqlDialect;
use crate::error::{OrmError, OrmResult};
use crate::factory::{
    apply_manipulation, ColumnGenRule, CustomValue, FactoryDocument, FakeValueGenerator, ReferenceResolver,
    ValueGenerator,
};
use super::definitions::{CreateOrUpdate, MatchOperator, SeedSpec, SeedSummary};

/// One generated row, in factory column order
pub type SeedRow = Vec<(String, DatabaseValue)>;

/// Which statement a row ended up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
}

/// SQL text with its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

/// Seed engine bound to one dialect
pub struct SeedEngine {
    dialect: Arc<dyn SqlDialect>,
    resolver: ReferenceResolver,
    generator: Box<dyn ValueGenerator>,
}

impl std::fmt::Debug for SeedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedEngine")
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl SeedEngine {
    pub fn new(dialect: Arc<dyn SqlDialect>) -> Self {
        Self::with_generator(dialect, Box::new(FakeValueGenerator::from_entropy()))
    }

    /// Engine with an injected generator, e.g. a seeded one
    pub fn with_generator(dialect: Arc<dyn SqlDialect>, generator: Box<dyn ValueGenerator>) -> Self {
        Self {
            resolver: ReferenceResolver::new(Arc::clone(&dialect)),
            dialect,
            generator,
        }
    }

    pub fn dialect(&self) -> &Arc<dyn SqlDialect> {
        &self.dialect
    }

    /// Run one seed spec: `execution_count` rows, then the custom query
    pub async fn run(
        &mut self,
        conn: &mut dyn DatabaseConnection,
        spec: &SeedSpec,
        factory: Option<&FactoryDocument>,
    ) -> OrmResult<SeedSummary> {
        spec.validate(factory)?;

        let mut summary = SeedSummary::default();
        match factory {
            Some(factory) => {
                for _ in 0..spec.execution_count {
                    let row = self.build_row(conn, factory).await?;
                    match self.write_row(conn, &spec.table, &row, spec.upsert()).await? {
                        WriteOutcome::Inserted => summary.rows_inserted += 1,
                        WriteOutcome::Updated => summary.rows_updated += 1,
                    }
                }
            }
            None if spec.execution_count > 0 => {
                tracing::warn!(
                    target: "tabula::seed",
                    "No factory for table {}, skipping {} row(s)",
                    spec.table,
                    spec.execution_count
                );
            }
            None => {}
        }

        if let Some(custom) = spec.custom_query() {
            for _ in 0..custom.execution_count {
                conn.execute(&custom.query, &[]).await?;
                summary.custom_queries += 1;
            }
        }

        tracing::info!(
            target: "tabula::seed",
            "Seeded {}: {} inserted, {} updated, {} custom quer(ies)",
            spec.table,
            summary.rows_inserted,
            summary.rows_updated,
            summary.custom_queries
        );
        Ok(summary)
    }

    /// Resolve every factory rule into a value
    pub async fn build_row(
        &mut self,
        conn: &mut dyn DatabaseConnection,
        factory: &FactoryDocument,
    ) -> OrmResult<SeedRow> {
        let mut row = Vec::new();
        for (column, rule) in factory.rules() {
            let value = self.resolve_value(conn, rule).await?;
            let value = match &rule.manipulation {
                Some(manipulation) => apply_manipulation(value, manipulation),
                None => value,
            };
            row.push((column.to_string(), value));
        }
        Ok(row)
    }

    async fn resolve_value(
        &mut self,
        conn: &mut dyn DatabaseConnection,
        rule: &ColumnGenRule,
    ) -> OrmResult<DatabaseValue> {
        if rule.fake {
            return Ok(self.generator.generate(rule.value_type.as_deref().unwrap_or_default()));
        }

        match rule.custom_value()? {
            CustomValue::Literal(literal) => Ok(DatabaseValue::from_json(literal).untyped()),
            CustomValue::Reference(reference) => Ok(self
                .resolver
                .resolve(conn, &reference.table, &reference.column)
                .await?
                .untyped()),
            CustomValue::Empty => Ok(DatabaseValue::Null),
        }
    }

    /// Insert the row, or update-else-insert when match columns are given
    pub async fn write_row(
        &self,
        conn: &mut dyn DatabaseConnection,
        table: &str,
        row: &SeedRow,
        upsert: Option<&CreateOrUpdate>,
    ) -> OrmResult<WriteOutcome> {
        let Some(upsert) = upsert else {
            let insert = self.insert_statement(table, row);
            conn.execute(&insert.sql, &insert.params).await?;
            return Ok(WriteOutcome::Inserted);
        };

        // two round trips, not atomic against concurrent writers
        let count = self.count_statement(table, row, upsert)?;
        let existing = conn
            .fetch_optional(&count.sql, &count.params)
            .await?
            .map(|r| r.get_by_index(0))
            .transpose()?
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        if existing > 0 {
            let update = self.update_statement(table, row, upsert)?;
            conn.execute(&update.sql, &update.params).await?;
            Ok(WriteOutcome::Updated)
        } else {
            let insert = self.insert_statement(table, row);
            conn.execute(&insert.sql, &insert.params).await?;
            Ok(WriteOutcome::Inserted)
        }
    }

    pub fn insert_statement(&self, table: &str, row: &SeedRow) -> BoundStatement {
        if row.is_empty() {
            return BoundStatement {
                sql: self.dialect.insert_default_values(table),
                params: Vec::new(),
            };
        }

        let mut params = Vec::new();
        let columns: Vec<String> = row.iter().map(|(c, _)| self.dialect.quote_identifier(c)).collect();
        let values: Vec<String> = row
            .iter()
            .map(|(_, value)| self.bind(value, &mut params))
            .collect();

        BoundStatement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.dialect.quote_identifier(table),
                columns.join(", "),
                values.join(", ")
            ),
            params,
        }
    }

    pub fn count_statement(&self, table: &str, row: &SeedRow, upsert: &CreateOrUpdate) -> OrmResult<BoundStatement> {
        let mut params = Vec::new();
        let predicate = self.match_predicate(table, row, upsert, &mut params)?;

        Ok(BoundStatement {
            sql: format!(
                "SELECT COUNT(*) AS count FROM {} WHERE {}",
                self.dialect.quote_identifier(table),
                predicate
            ),
            params,
        })
    }

    pub fn update_statement(&self, table: &str, row: &SeedRow, upsert: &CreateOrUpdate) -> OrmResult<BoundStatement> {
        let mut params = Vec::new();
        let assignments: Vec<String> = row
            .iter()
            .map(|(column, value)| {
                format!(
                    "{} = {}",
                    self.dialect.quote_identifier(column),
                    self.bind(value, &mut params)
                )
            })
            .collect();
        let predicate = self.match_predicate(table, row, upsert, &mut params)?;

        Ok(BoundStatement {
            sql: format!(
                "UPDATE {} SET {} WHERE {}",
                self.dialect.quote_identifier(table),
                assignments.join(", "),
                predicate
            ),
            params,
        })
    }

    fn match_predicate(
        &self,
        table: &str,
        row: &SeedRow,
        upsert: &CreateOrUpdate,
        params: &mut Vec<DatabaseValue>,
    ) -> OrmResult<String> {
        if upsert.match_columns.len() > 1 && upsert.operator.is_none() {
            return Err(OrmError::MissingOperator(table.to_string()));
        }
        let joiner = format!(" {} ", upsert.operator.unwrap_or(MatchOperator::And).as_sql());

        let mut conditions = Vec::with_capacity(upsert.match_columns.len());
        for column in &upsert.match_columns {
            let value = row
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, value)| value)
                .ok_or_else(|| {
                    OrmError::InvalidDocument(format!("match column '{}' missing from row for '{}'", column, table))
                })?;

            let column = self.dialect.quote_identifier(column);
            if value.is_null() {
                conditions.push(format!("{} IS NULL", column));
            } else {
                conditions.push(format!("{} = {}", column, self.bind(value, params)));
            }
        }

        Ok(conditions.join(&joiner))
    }

    /// Placeholder for a value, or inline NULL and untyped text
    fn bind(&self, value: &DatabaseValue, params: &mut Vec<DatabaseValue>) -> String {
        match value {
            DatabaseValue::Null => "NULL".to_string(),
            DatabaseValue::Untyped(text) => match self.dialect.untyped_literal(text) {
                Some(literal) => literal,
                None => self.push_param(value, params),
            },
            _ => self.push_param(value, params),
        }
    }

    fn push_param(&self, value: &DatabaseValue, params: &mut Vec<DatabaseValue>) -> String {
        params.push(value.clone());
        self.dialect.placeholder(params.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ValueRow;
    use crate::dialect::{MySqlDialect, PostgresDialect};
    use crate::testing::MemoryConnection;
    use serde_json::json;

    fn row(pairs: &[(&str, DatabaseValue)]) -> SeedRow {
        pairs.iter().map(|(c, v)| (c.to_string(), v.clone())).collect()
    }

    fn upsert(columns: &[&str], operator: Option<MatchOperator>) -> CreateOrUpdate {
        CreateOrUpdate {
            match_columns: columns.iter().map(|c| c.to_string()).collect(),
            operator,
        }
    }

    fn pg_engine() -> SeedEngine {
        SeedEngine::with_generator(Arc::new(PostgresDialect), Box::new(FakeValueGenerator::seeded(42)))
    }

    #[test]
    fn test_insert_inlines_nulls() {
        let engine = pg_engine();
        let statement = engine.insert_statement(
            "users",
            &row(&[
                ("email", DatabaseValue::from("a@example.com")),
                ("nickname", DatabaseValue::Null),
                ("age", DatabaseValue::Int32(30)),
            ]),
        );

        assert_eq!(
            statement.sql,
            "INSERT INTO \"users\" (\"email\", \"nickname\", \"age\") VALUES ($1, NULL, $2)"
        );
        assert_eq!(statement.params, vec![DatabaseValue::from("a@example.com"), DatabaseValue::Int32(30)]);
    }

    #[test]
    fn test_mysql_statements() {
        let engine = SeedEngine::with_generator(Arc::new(MySqlDialect), Box::new(FakeValueGenerator::seeded(1)));
        let data = row(&[("email", DatabaseValue::from("a@example.com")), ("name", DatabaseValue::from("A"))]);
        let upsert = upsert(&["email", "name"], Some(MatchOperator::Or));

        assert_eq!(
            engine.count_statement("users", &data, &upsert).unwrap().sql,
            "SELECT COUNT(*) AS count FROM `users` WHERE `email` = ? OR `name` = ?"
        );
        assert_eq!(
            engine.update_statement("users", &data, &upsert).unwrap().sql,
            "UPDATE `users` SET `email` = ?, `name` = ? WHERE `email` = ? OR `name` = ?"
        );
        assert_eq!(engine.insert_statement("users", &Vec::new()).sql, "INSERT INTO `users` () VALUES ()");
    }

    #[test]
    fn test_untyped_text_inlined_on_postgres_only() {
        let data = row(&[
            ("born", DatabaseValue::Untyped("2024-01-01".into())),
            ("email", DatabaseValue::from("a@example.com")),
        ]);
        let key = upsert(&["born"], None);

        let pg = pg_engine().update_statement("users", &data, &key).unwrap();
        assert_eq!(
            pg.sql,
            "UPDATE \"users\" SET \"born\" = '2024-01-01', \"email\" = $1 WHERE \"born\" = '2024-01-01'"
        );
        assert_eq!(pg.params, vec![DatabaseValue::from("a@example.com")]);

        let engine = SeedEngine::with_generator(Arc::new(MySqlDialect), Box::new(FakeValueGenerator::seeded(1)));
        let mysql = engine.insert_statement("users", &data);
        assert_eq!(mysql.sql, "INSERT INTO `users` (`born`, `email`) VALUES (?, ?)");
        assert_eq!(mysql.params[0], DatabaseValue::Untyped("2024-01-01".into()));
    }

    #[test]
    fn test_update_numbers_placeholders_after_assignments() {
        let engine = pg_engine();
        let data = row(&[("email", DatabaseValue::from("a@example.com")), ("bio", DatabaseValue::Null)]);
        let statement = engine.update_statement("users", &data, &upsert(&["email"], None)).unwrap();

        assert_eq!(
            statement.sql,
            "UPDATE \"users\" SET \"email\" = $1, \"bio\" = NULL WHERE \"email\" = $2"
        );
        assert_eq!(statement.params.len(), 2);
    }

    #[test]
    fn test_match_predicate_requires_operator() {
        let engine = pg_engine();
        let data = row(&[("a", DatabaseValue::Int32(1)), ("b", DatabaseValue::Int32(2))]);

        assert!(matches!(
            engine.count_statement("t", &data, &upsert(&["a", "b"], None)),
            Err(OrmError::MissingOperator(_))
        ));
    }

    #[tokio::test]
    async fn test_value_priority() {
        let mut engine = pg_engine();
        let factory = FactoryDocument::from_json(
            &json!({"columns": [
                {"code": {"fake": true, "type": "alphanumeric", "custom": "ignored"}},
                {"role": {"fake": false, "custom": "admin"}},
                {"owner_id": {"fake": false, "custom": {"reference_table": {"table": "users", "column": "id"}}}},
                {"note": {"fake": false}},
                {"slug": {"fake": false, "custom": "Hello World", "manipulation": {"regex": "\\s+", "replace_with": "-"}}}
            ]})
            .to_string(),
        )
        .unwrap();
        let mut conn = MemoryConnection::with_responder(|_, _| Ok(vec![ValueRow::new().with("id", 9i64)]));

        let built = engine.build_row(&mut conn, &factory).await.unwrap();
        assert_eq!(built[0].0, "code");
        assert_eq!(built[0].1.as_str().unwrap().len(), 10);
        assert_eq!(built[1].1, DatabaseValue::Untyped("admin".into()));
        assert_eq!(built[2].1, DatabaseValue::Int64(9));
        assert_eq!(built[3].1, DatabaseValue::Null);
        assert_eq!(built[4].1, DatabaseValue::Untyped("Hello-World".into()));
    }

    #[tokio::test]
    async fn test_upsert_branches_on_count() {
        let engine = pg_engine();
        let data = row(&[("email", DatabaseValue::from("a@example.com"))]);
        let key = upsert(&["email"], None);

        let mut existing = MemoryConnection::with_responder(|sql, _| {
            if sql.starts_with("SELECT COUNT(*)") {
                Ok(vec![ValueRow::new().with("count", 1i64)])
            } else {
                Ok(Vec::new())
            }
        });
        let outcome = engine.write_row(&mut existing, "users", &data, Some(&key)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Updated);
        assert!(existing.statements()[1].starts_with("UPDATE \"users\""));

        let mut fresh = MemoryConnection::with_responder(|sql, _| {
            if sql.starts_with("SELECT COUNT(*)") {
                Ok(vec![ValueRow::new().with("count", 0i64)])
            } else {
                Ok(Vec::new())
            }
        });
        let outcome = engine.write_row(&mut fresh, "users", &data, Some(&key)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Inserted);
        assert!(fresh.statements()[1].starts_with("INSERT INTO \"users\""));
    }

    #[tokio::test]
    async fn test_run_counts_rows_and_custom_queries() {
        let mut engine = pg_engine();
        let factory = FactoryDocument::from_json(r#"{"columns": [{"email": {"fake": true, "type": "email"}}]}"#).unwrap();
        let spec: SeedSpec = serde_json::from_value(json!({
            "table": "users",
            "factory": "user",
            "execution_count": 5,
            "custom": {"query": "UPDATE users SET active = TRUE", "execution_count": 2}
        }))
        .unwrap();
        let mut conn = MemoryConnection::new();

        let summary = engine.run(&mut conn, &spec, Some(&factory)).await.unwrap();
        assert_eq!(summary.rows_inserted, 5);
        assert_eq!(summary.custom_queries, 2);

        let statements = conn.statements();
        assert_eq!(statements.len(), 7);
        assert_eq!(statements[5], "UPDATE users SET active = TRUE");
    }

    #[tokio::test]
    async fn test_missing_operator_fails_before_any_write() {
        let mut engine = pg_engine();
        let factory = FactoryDocument::from_json(
            r#"{"columns": [{"email": {"fake": true, "type": "email"}}, {"name": {"fake": true, "type": "name"}}]}"#,
        )
        .unwrap();
        let spec: SeedSpec = serde_json::from_value(json!({
            "table": "users",
            "factory": "user",
            "execution_count": 2,
            "createOrUpdate": {"matchColumns": ["email", "name"]}
        }))
        .unwrap();
        let mut conn = MemoryConnection::new();

        assert!(matches!(
            engine.run(&mut conn, &spec, Some(&factory)).await,
            Err(OrmError::MissingOperator(_))
        ));
        assert!(conn.statements().is_empty());
    }
}
