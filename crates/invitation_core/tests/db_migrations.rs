use invitation_core::db::migrations::latest_version;
use invitation_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "greeting");
    assert_table_exists(&conn, "guest");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invitation.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO greeting (alias_name, message, id_user) VALUES ('Ani', 'hi', 1);",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM greeting;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn upgrading_guest_table_folds_existing_user_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v2.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_greeting.sql"))
        .unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0002_guest.sql"))
        .unwrap();
    conn.execute_batch(
        "INSERT INTO guest (user_name, display_name) VALUES ('Álvaro', 'Álvaro Núñez');
         PRAGMA user_version = 2;",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let folded: String = conn
        .query_row("SELECT user_name_folded FROM guest;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(folded, "álvaro");
}

#[test]
fn store_assigns_id_and_created_at_defaults() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO greeting (id_user) VALUES (1);", [])
        .unwrap();

    let (id, created_at, is_confirm, alias_name): (i64, String, i64, String) = conn
        .query_row(
            "SELECT id, created_at, is_confirm, alias_name FROM greeting;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(id, 1);
    assert!(invitation_core::parse_timestamp(&created_at).is_some());
    assert_eq!(is_confirm, 1);
    assert_eq!(alias_name, "");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
