use membercrm_core::db::migrations::latest_version;
use membercrm_core::db::schema::COLLECTIONS;
use membercrm_core::db::{open_db, open_db_in_memory, Database, DbError, StoreConfig};
use membercrm_core::{Store, SystemClock};
use rusqlite::Connection;
use std::sync::Arc;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for def in COLLECTIONS {
        assert_table_exists(&conn, def.name);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("membercrm.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "members");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_inside_a_missing_directory_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = open_db(dir.path().join("missing").join("membercrm.sqlite3")).unwrap_err();
    assert!(matches!(err, DbError::Open { .. }), "unexpected error: {err}");
}

#[test]
fn every_declared_index_exists_with_matching_uniqueness() {
    let conn = open_db_in_memory().unwrap();

    for def in COLLECTIONS {
        let indices = index_list(&conn, def.name);
        for index in def.indices {
            let expected = format!("idx_{}_{}", def.name, index.name);
            let unique = indices
                .iter()
                .find(|(name, _)| *name == expected)
                .map(|(_, unique)| *unique)
                .unwrap_or_else(|| panic!("missing index {expected}"));
            assert_eq!(unique, index.unique, "uniqueness of {expected}");
        }
    }
}

#[tokio::test]
async fn closed_handle_rejects_calls_until_reconnected() {
    let db = Database::new(StoreConfig::in_memory());
    assert!(!db.is_open().await);

    assert_eq!(db.schema_version().await.unwrap(), latest_version());
    assert!(db.is_open().await);

    db.close().await;
    assert!(matches!(db.schema_version().await, Err(DbError::Closed)));

    db.connect().await.unwrap();
    assert_eq!(db.schema_version().await.unwrap(), latest_version());
}

#[tokio::test]
async fn store_open_surfaces_migration_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    let result = Store::open_with_clock(StoreConfig::file(&path), Arc::new(SystemClock)).await;
    assert!(matches!(
        result,
        Err(DbError::UnsupportedSchemaVersion { db_version: 42, .. })
    ));
}

#[tokio::test]
async fn file_store_keeps_records_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("membercrm.sqlite3");

    let store = Store::open(StoreConfig::file(&path)).await.unwrap();
    store
        .settings()
        .set("theme", serde_json::json!("dark"), None)
        .await
        .unwrap();
    store.close().await;

    let reopened = Store::open(StoreConfig::file(&path)).await.unwrap();
    assert_eq!(
        reopened.settings().get_value("theme").await.unwrap(),
        Some(serde_json::json!("dark"))
    );
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn index_list(conn: &Connection, table: &str) -> Vec<(String, bool)> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA index_list({table});"))
        .unwrap();
    stmt.query_map([], |row| {
        let name: String = row.get("name")?;
        let unique: i64 = row.get("unique")?;
        Ok((name, unique == 1))
    })
    .unwrap()
    .collect::<Result<_, _>>()
    .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table_name}` to exist");
}
