//! MySQL Backend Implementation
//!
//! Mirrors the PostgreSQL backend on top of a single sqlx `MySqlConnection`.
//! Parameter-less statements use the text protocol; `START TRANSACTION` and
//! most DDL are not accepted as prepared statements.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Executor, MySql, Row as SqlxRow, TypeInfo, ValueRef};
use crate::error::{OrmError, OrmResult};
use super::core::*;

/// MySQL connection implementation
pub struct MySqlDatabaseConnection {
    conn: Option<MySqlConnection>,
}

impl MySqlDatabaseConnection {
    /// Open a connection from a `mysql://` URL
    pub async fn connect(database_url: &str) -> OrmResult<Self> {
        let conn = MySqlConnection::connect(database_url)
            .await
            .map_err(|e| OrmError::ConnectionUnavailable(format!("Failed to connect to MySQL: {}", e)))?;

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> OrmResult<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| OrmError::ConnectionUnavailable("MySQL connection already closed".to_string()))
    }
}

#[async_trait]
impl DatabaseConnection for MySqlDatabaseConnection {
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

        Ok(rows.into_iter().map(|row| Box::new(MySqlDatabaseRow::new(row)) as Box<dyn DatabaseRow>).collect())
    }

    async fn close(&mut self) -> OrmResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| OrmError::ConnectionUnavailable(format!("Failed to close MySQL connection: {}", e)))?;
        }
        Ok(())
    }
}

/// MySQL row implementation
pub struct MySqlDatabaseRow {
    row: MySqlRow,
}

impl MySqlDatabaseRow {
    pub fn new(row: MySqlRow) -> Self {
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
            "BOOLEAN" => DatabaseValue::Bool(row.try_get(index)?),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => DatabaseValue::Int64(row.try_get(index)?),
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "BIGINT UNSIGNED" => {
                let unsigned: u64 = row.try_get(index)?;
                match i64::try_from(unsigned) {
                    Ok(v) => DatabaseValue::Int64(v),
                    Err(_) => DatabaseValue::String(unsigned.to_string()),
                }
            }
            "FLOAT" => DatabaseValue::Float32(row.try_get(index)?),
            "DOUBLE" => DatabaseValue::Float64(row.try_get(index)?),
            "TIMESTAMP" => DatabaseValue::DateTime(row.try_get::<DateTime<Utc>, _>(index)?),
            "DATETIME" => {
                let naive: NaiveDateTime = row.try_get(index)?;
                DatabaseValue::DateTime(DateTime::from_naive_utc_and_offset(naive, Utc))
            }
            "DATE" => DatabaseValue::Date(row.try_get(index)?),
            "TIME" => DatabaseValue::Time(row.try_get(index)?),
            "JSON" => DatabaseValue::Json(row.try_get::<JsonValue, _>(index)?),
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                let bytes: Vec<u8> = row.try_get(index)?;
                match String::from_utf8(bytes) {
                    Ok(text) => DatabaseValue::String(text),
                    Err(e) => DatabaseValue::Bytes(e.into_bytes()),
                }
            }
            // DECIMAL travels as its textual form in both protocols
            _ => DatabaseValue::String(row.try_get_unchecked::<String, _>(index)?),
        };

        Ok(value)
    }
}

impl DatabaseRow for MySqlDatabaseRow {
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
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[DatabaseValue],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = bind_database_value(query, param);
    }
    query
}

/// Bind a DatabaseValue to a MySQL query
fn bind_database_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &DatabaseValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        DatabaseValue::Null => query.bind(None::<String>),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float32(f) => query.bind(*f),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) | DatabaseValue::Untyped(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        // uuid columns in MySQL are CHAR(36) by convention
        DatabaseValue::Uuid(u) => query.bind(u.to_string()),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
        DatabaseValue::Date(d) => query.bind(*d),
        DatabaseValue::Time(t) => query.bind(*t),
        DatabaseValue::Json(j) => query.bind(j.clone()),
    }
}
