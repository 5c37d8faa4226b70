use std::sync::{Arc, Mutex};

use serde_json::json;
use tabula_orm::{
    DatabaseValue, MigrationConfig, MigrationDriver, MySqlDialect, OrmError, PostgresDialect, SchemaCompiler,
    SqlDialect, ValueRow,
};
use tabula_orm::migrations::MigrationDocument;
use tabula_orm::testing::MemoryConnection;
use tempfile::TempDir;

/// Ledger rows and DDL seen by a simulated server
#[derive(Debug, Default)]
struct Server {
    ledger: Vec<(String, i64)>,
    ddl: Vec<String>,
}

fn simulated(server: Arc<Mutex<Server>>) -> MemoryConnection {
    failing_on(server, None)
}

/// Simulated server that rejects the CREATE TABLE for `broken_table`
fn failing_on(server: Arc<Mutex<Server>>, broken_table: Option<&'static str>) -> MemoryConnection {
    MemoryConnection::with_responder(move |sql, params| {
        let mut server = server.lock().unwrap();
        if let Some(table) = broken_table {
            if sql.starts_with("CREATE TABLE IF NOT EXISTS") && sql.contains(&format!("\"{}\"", table)) {
                return Err(OrmError::sql(format!("relation \"{}\" cannot be created", table), Some(sql)));
            }
        }
        if sql.starts_with("SELECT COALESCE(MAX(batch), 0) + 1") {
            let next = server.ledger.iter().map(|(_, b)| *b).max().unwrap_or(0) + 1;
            Ok(vec![ValueRow::new().with("batch", next)])
        } else if sql.starts_with("SELECT migration FROM") {
            Ok(server
                .ledger
                .iter()
                .map(|(m, _)| ValueRow::new().with("migration", m.as_str()))
                .collect())
        } else if sql.starts_with("INSERT INTO migrations") {
            let name = params[0].as_str().unwrap().to_string();
            let batch = params[1].as_i64().unwrap();
            server.ledger.push((name, batch));
            Ok(Vec::new())
        } else if sql.starts_with("DELETE FROM migrations") {
            let name = params[0].as_str().unwrap().to_string();
            server.ledger.retain(|(m, _)| m != &name);
            Ok(Vec::new())
        } else if sql.contains("information_schema") || sql.starts_with("SHOW COLUMNS") {
            Ok(vec![ValueRow::new().with("column_name", "batch")])
        } else {
            if !sql.starts_with("CREATE TABLE IF NOT EXISTS migrations")
                && !matches!(sql, "BEGIN;" | "START TRANSACTION;" | "COMMIT;" | "ROLLBACK;")
            {
                server.ddl.push(sql.to_string());
            }
            Ok(Vec::new())
        }
    })
}

fn write_migration(dir: &TempDir, name: &str, table: &str) {
    let doc = json!({
        "migrations": [{
            "action": "create",
            "table": table,
            "columns": [{"name": "id", "type": "int", "primaryKey": true, "autoIncrement": true}]
        }],
        "rollback": [{"action": "drop", "table": table, "dropIfExists": true, "ignoreForeignAndCascade": false}]
    });
    std::fs::write(dir.path().join(name), doc.to_string()).unwrap();
}

#[tokio::test]
async fn test_apply_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_migration(&dir, "20240101000000_users.json", "users");
    write_migration(&dir, "20240102000000_posts.json", "posts");

    let server = Arc::new(Mutex::new(Server::default()));
    let driver = MigrationDriver::new(Arc::new(PostgresDialect), MigrationConfig::new(dir.path()));

    let first = driver.apply_migrations(&mut simulated(server.clone()), None).await.unwrap();
    assert_eq!(first.applied_migrations.len(), 2);
    let ledger_after_first = server.lock().unwrap().ledger.clone();
    let ddl_after_first = server.lock().unwrap().ddl.len();

    let second = driver.apply_migrations(&mut simulated(server.clone()), None).await.unwrap();
    assert!(second.applied_migrations.is_empty());
    assert_eq!(second.skipped_migrations.len(), 2);

    let server = server.lock().unwrap();
    assert_eq!(server.ledger, ledger_after_first);
    assert_eq!(server.ddl.len(), ddl_after_first);
}

#[tokio::test]
async fn test_apply_order_is_reverse_lexical() {
    let dir = TempDir::new().unwrap();
    write_migration(&dir, "20240101000000_users.json", "users");
    write_migration(&dir, "20240102000000_posts.json", "posts");

    let server = Arc::new(Mutex::new(Server::default()));
    let driver = MigrationDriver::new(Arc::new(MySqlDialect), MigrationConfig::new(dir.path()));
    let result = driver.apply_migrations(&mut simulated(server.clone()), None).await.unwrap();

    assert_eq!(
        result.applied_migrations,
        vec!["20240102000000_posts.json", "20240101000000_users.json"]
    );
    let server = server.lock().unwrap();
    assert!(server.ddl[0].contains("`posts`"));
    assert!(server.ddl[1].contains("`users`"));
}

#[tokio::test]
async fn test_batches_increase_per_run() {
    let dir = TempDir::new().unwrap();
    let server = Arc::new(Mutex::new(Server::default()));
    server.lock().unwrap().ledger.push(("20230101000000_legacy.json".to_string(), 4));

    write_migration(&dir, "20240101000000_users.json", "users");
    write_migration(&dir, "20240102000000_posts.json", "posts");
    let driver = MigrationDriver::new(Arc::new(PostgresDialect), MigrationConfig::new(dir.path()));
    let first = driver.apply_migrations(&mut simulated(server.clone()), None).await.unwrap();
    assert_eq!(first.batch, Some(5));

    write_migration(&dir, "20240103000000_tags.json", "tags");
    let second = driver.apply_migrations(&mut simulated(server.clone()), None).await.unwrap();
    assert_eq!(second.batch, Some(6));
    assert_eq!(second.applied_migrations, vec!["20240103000000_tags.json"]);

    let server = server.lock().unwrap();
    let batch_of = |name: &str| server.ledger.iter().find(|(m, _)| m == name).map(|(_, b)| *b);
    assert_eq!(batch_of("20240101000000_users.json"), Some(5));
    assert_eq!(batch_of("20240102000000_posts.json"), Some(5));
    assert_eq!(batch_of("20240103000000_tags.json"), Some(6));
}

#[tokio::test]
async fn test_rollback_of_one_file_is_symmetric() {
    let dir = TempDir::new().unwrap();
    write_migration(&dir, "20240101000000_users.json", "users");
    write_migration(&dir, "20240102000000_posts.json", "posts");

    let server = Arc::new(Mutex::new(Server::default()));
    let driver = MigrationDriver::new(Arc::new(PostgresDialect), MigrationConfig::new(dir.path()));
    driver.apply_migrations(&mut simulated(server.clone()), None).await.unwrap();
    server.lock().unwrap().ddl.clear();

    let result = driver
        .rollback_migrations(&mut simulated(server.clone()), Some("20240101000000_users"))
        .await
        .unwrap();
    assert_eq!(result.rolled_back_migrations, vec!["20240101000000_users.json"]);

    let server = server.lock().unwrap();
    assert_eq!(server.ledger.len(), 1);
    assert_eq!(server.ledger[0].0, "20240102000000_posts.json");
    assert_eq!(server.ddl, vec!["DROP TABLE \"users\";".to_string()]);
}

#[tokio::test]
async fn test_failed_file_stops_the_run() {
    let dir = TempDir::new().unwrap();
    write_migration(&dir, "20240101000000_users.json", "users");
    write_migration(&dir, "20240102000000_posts.json", "posts");
    write_migration(&dir, "20240103000000_tags.json", "tags");

    let server = Arc::new(Mutex::new(Server::default()));
    let driver = MigrationDriver::new(Arc::new(PostgresDialect), MigrationConfig::new(dir.path()));
    let mut conn = failing_on(server.clone(), Some("posts"));

    let err = driver.apply_migrations(&mut conn, None).await.unwrap_err();
    assert!(matches!(err, OrmError::SqlExecution { .. }), "unexpected error: {:?}", err);

    let statements = conn.statements();
    let failed_at = statements.iter().position(|s| s.contains("\"posts\"")).unwrap();
    assert_eq!(statements[failed_at + 1], "ROLLBACK;");
    assert!(!statements.iter().any(|s| s.contains("\"users\"")));

    let server = server.lock().unwrap();
    assert_eq!(server.ledger, vec![("20240103000000_tags.json".to_string(), 1)]);
    assert_eq!(server.ddl.len(), 1);
    assert!(server.ddl[0].contains("\"tags\""));
}

#[tokio::test]
async fn test_rollback_of_whole_directory_runs_newest_first() {
    let dir = TempDir::new().unwrap();
    write_migration(&dir, "20240101000000_users.json", "users");
    write_migration(&dir, "20240102000000_posts.json", "posts");
    write_migration(&dir, "20240103000000_tags.json", "tags");

    let server = Arc::new(Mutex::new(Server::default()));
    let driver = MigrationDriver::new(Arc::new(PostgresDialect), MigrationConfig::new(dir.path()));
    driver.apply_migrations(&mut simulated(server.clone()), None).await.unwrap();
    assert_eq!(server.lock().unwrap().ledger.len(), 3);
    server.lock().unwrap().ddl.clear();

    let result = driver.rollback_migrations(&mut simulated(server.clone()), None).await.unwrap();
    assert_eq!(
        result.rolled_back_migrations,
        vec![
            "20240103000000_tags.json",
            "20240102000000_posts.json",
            "20240101000000_users.json"
        ]
    );
    assert!(result.skipped_migrations.is_empty());

    let server = server.lock().unwrap();
    assert!(server.ledger.is_empty());
    assert_eq!(
        server.ddl,
        vec![
            "DROP TABLE \"tags\";".to_string(),
            "DROP TABLE \"posts\";".to_string(),
            "DROP TABLE \"users\";".to_string()
        ]
    );
}

#[test]
fn test_create_table_round_trip_per_dialect() {
    let doc: MigrationDocument = serde_json::from_value(json!({
        "migrations": [{"table": "t", "action": "create", "columns": [{"name": "id", "type": "int", "primaryKey": true}]}],
        "rollback": []
    }))
    .unwrap();

    let pg = SchemaCompiler::new(Arc::new(PostgresDialect)).compile_schema(&doc, false).unwrap();
    assert_eq!(pg.statements, vec!["CREATE TABLE IF NOT EXISTS \"t\" (\"id\" INTEGER PRIMARY KEY);"]);
    assert_eq!(pg.begin, "BEGIN;");

    let mysql = SchemaCompiler::new(Arc::new(MySqlDialect)).compile_schema(&doc, false).unwrap();
    assert_eq!(mysql.statements, vec!["CREATE TABLE IF NOT EXISTS `t` (`id` INT PRIMARY KEY);"]);
    assert_eq!(mysql.begin, "START TRANSACTION;");
}

#[test]
fn test_placeholder_styles() {
    let pg: Arc<dyn SqlDialect> = Arc::new(PostgresDialect);
    let mysql: Arc<dyn SqlDialect> = Arc::new(MySqlDialect);
    assert_eq!(pg.placeholder(3), "$3");
    assert_eq!(mysql.placeholder(3), "?");
    assert_eq!(DatabaseValue::Null.to_string(), "NULL");
}
