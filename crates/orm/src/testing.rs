//! Test utilities
//!
//! [`MemoryConnection`] records every statement it receives and answers
//! queries through a caller-supplied responder, so compiler, ledger and seed
//! behaviour can be checked without a running database server.

use async_trait::async_trait;

use crate::backends::{DatabaseConnection, DatabaseRow, DatabaseValue, ValueRow};
use crate::error::OrmResult;

type Responder = Box<dyn FnMut(&str, &[DatabaseValue]) -> OrmResult<Vec<ValueRow>> + Send>;

/// In-memory stand-in for a live connection
pub struct MemoryConnection {
    calls: Vec<(String, Vec<DatabaseValue>)>,
    responder: Responder,
    closed: bool,
}

impl MemoryConnection {
    /// Connection that accepts every statement and returns no rows
    pub fn new() -> Self {
        Self::with_responder(|_, _| Ok(Vec::new()))
    }

    /// Connection answering each statement with `responder`.
    ///
    /// The responder sees executed statements too; returning an error from it
    /// makes that statement fail.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&str, &[DatabaseValue]) -> OrmResult<Vec<ValueRow>> + Send + 'static,
    {
        Self {
            calls: Vec::new(),
            responder: Box::new(responder),
            closed: false,
        }
    }

    /// SQL text of every call, in order
    pub fn statements(&self) -> Vec<String> {
        self.calls.iter().map(|(sql, _)| sql.clone()).collect()
    }

    /// Every call with its bound parameters
    pub fn calls(&self) -> &[(String, Vec<DatabaseValue>)] {
        &self.calls
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn respond(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<ValueRow>> {
        self.calls.push((sql.to_string(), params.to_vec()));
        (self.responder)(sql, params)
    }
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("calls", &self.calls.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[async_trait]
impl DatabaseConnection for MemoryConnection {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.respond(sql, params)?;
        Ok(1)
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        let rows = self.respond(sql, params)?;
        Ok(rows
            .into_iter()
            .map(|row| Box::new(row) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn close(&mut self) -> OrmResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let mut conn = MemoryConnection::new();
        conn.execute("CREATE TABLE t (id INT)", &[]).await.unwrap();
        conn.fetch_all("SELECT id FROM t WHERE id = $1", &[DatabaseValue::Int32(1)])
            .await
            .unwrap();

        assert_eq!(conn.statements(), vec!["CREATE TABLE t (id INT)", "SELECT id FROM t WHERE id = $1"]);
        assert_eq!(conn.calls()[1].1, vec![DatabaseValue::Int32(1)]);
    }

    #[tokio::test]
    async fn test_responder_rows_and_failures() {
        let mut conn = MemoryConnection::with_responder(|sql, _| {
            if sql.starts_with("BROKEN") {
                Err(OrmError::sql("syntax error", Some(sql)))
            } else {
                Ok(vec![ValueRow::new().with("count", 2i64)])
            }
        });

        let row = conn.fetch_optional("SELECT COUNT(*) AS count FROM t", &[]).await.unwrap().unwrap();
        assert_eq!(row.get_by_name("count").unwrap(), DatabaseValue::Int64(2));
        assert!(conn.execute("BROKEN", &[]).await.is_err());

        conn.close().await.unwrap();
        assert!(conn.is_closed());
    }
}
