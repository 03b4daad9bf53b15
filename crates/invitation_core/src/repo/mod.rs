//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Read paths reject invalid persisted state (`InvalidData`) instead of
//!   masking it.
//! - Store failures are always returned to the caller, never swallowed.

pub mod greeting_repo;
pub mod guest_repo;

use rusqlite::Connection;

use self::greeting_repo::RepoResult;

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
