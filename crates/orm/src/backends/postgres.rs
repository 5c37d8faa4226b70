//! PostgreSQL Backend Implementation
//!
//! A single sqlx `PgConnection` behind the [`DatabaseConnection`] trait.
//! Statements without parameters go through the simple query protocol so
//! `BEGIN`/`COMMIT` and multi-keyword DDL run unchanged.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Executor, Postgres, Row as SqlxRow, TypeInfo, ValueRef};
use crate::error::{OrmError, OrmResult};
use super::core::*;

/// PostgreSQL connection implementation
pub struct PostgresConnection {
    conn: Option<PgConnection>,
}

impl PostgresConnection {
    /// Open a connection from a `postgres://` URL
    pub async fn connect(database_url: &str) -> OrmResult<Self> {
        let conn = PgConnection::connect(database_url)
            .await
            .map_err(|e| OrmError::ConnectionUnavailable(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> OrmResult<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| OrmError::ConnectionUnavailable("PostgreSQL connection already closed".to_string()))
    }
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        let conn = self.conn()?;

        let result = if params.is_empty() {
            Executor::execute(&mut *conn, sql).await
        } else {
            bind_all(sqlx::query(sql), params).execute(&mut *conn).await
        };

        result
            .map(|r| r.rows_affected())
            .map_err(|e| OrmError::sql(format!("Query execution failed: {}", e), Some(sql)))
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        let conn = self.conn()?;

        let rows = if params.is_empty() {
            Executor::fetch_all(&mut *conn, sql).await
        } else {
            bind_all(sqlx::query(sql), params).fetch_all(&mut *conn).await
        }
        .map_err(|e| OrmError::sql(format!("Query fetch failed: {}", e), Some(sql)))?;

        Ok(rows.into_iter().map(|row| Box::new(PostgresRow::new(row)) as Box<dyn DatabaseRow>).collect())
    }

    async fn close(&mut self) -> OrmResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| OrmError::ConnectionUnavailable(format!("Failed to close PostgreSQL connection: {}", e)))?;
        }
        Ok(())
    }
}

/// PostgreSQL row implementation
pub struct PostgresRow {
    row: PgRow,
}

impl PostgresRow {
    pub fn new(row: PgRow) -> Self {
        Self { row }
    }

    fn decode(&self, index: usize) -> OrmResult<DatabaseValue> {
        let raw = self.row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(DatabaseValue::Null);
        }

        let type_name = self.row.column(index).type_info().name().to_uppercase();
        let row = &self.row;

        let value = match type_name.as_str() {
            "BOOL" => DatabaseValue::Bool(row.try_get(index)?),
            "INT2" => DatabaseValue::Int32(row.try_get::<i16, _>(index)? as i32),
            "INT4" => DatabaseValue::Int32(row.try_get(index)?),
            "INT8" => DatabaseValue::Int64(row.try_get(index)?),
            "FLOAT4" => DatabaseValue::Float32(row.try_get(index)?),
            "FLOAT8" => DatabaseValue::Float64(row.try_get(index)?),
            "UUID" => DatabaseValue::Uuid(row.try_get(index)?),
            "TIMESTAMPTZ" => DatabaseValue::DateTime(row.try_get::<DateTime<Utc>, _>(index)?),
            "TIMESTAMP" => {
                let naive: NaiveDateTime = row.try_get(index)?;
                DatabaseValue::DateTime(DateTime::from_naive_utc_and_offset(naive, Utc))
            }
            "DATE" => DatabaseValue::Date(row.try_get(index)?),
            "TIME" => DatabaseValue::Time(row.try_get(index)?),
            "JSON" | "JSONB" => DatabaseValue::Json(row.try_get::<JsonValue, _>(index)?),
            "BYTEA" => DatabaseValue::Bytes(row.try_get(index)?),
            // NUMERIC, enums and friends arrive in text format on the simple protocol
            _ => DatabaseValue::String(row.try_get_unchecked::<String, _>(index)?),
        };

        Ok(value)
    }
}

impl DatabaseRow for PostgresRow {
    fn get_by_index(&self, index: usize) -> OrmResult<DatabaseValue> {
        if index >= self.row.len() {
            return Err(OrmError::sql(format!("Column index {} out of range", index), None));
        }
        self.decode(index)
    }

    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue> {
        let index = self
            .row
            .columns()
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| OrmError::sql(format!("Column '{}' not found", name), None))?;
        self.decode(index)
    }

    fn column_count(&self) -> usize {
        self.row.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.row.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[DatabaseValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = bind_database_value(query, param);
    }
    query
}

/// Bind a DatabaseValue to a PostgreSQL query
fn bind_database_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &DatabaseValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        DatabaseValue::Null => query.bind(None::<String>),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float32(f) => query.bind(*f),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) | DatabaseValue::Untyped(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Uuid(u) => query.bind(*u),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
        DatabaseValue::Date(d) => query.bind(*d),
        DatabaseValue::Time(t) => query.bind(*t),
        DatabaseValue::Json(j) => query.bind(j.clone()),
    }
}
