//! Guest list repository contract and SQLite implementation.
//!
//! # Invariants
//! - `user_name` matching is case-insensitive across Unicode: lookups
//!   compare folded patterns against the `user_name_folded` column.
//! - `%` and `_` in a lookup pattern are honored as `LIKE` wildcards.
//! - Two guests never share a folded user name.

use crate::model::greeting::parse_timestamp;
use crate::model::guest::{fold_user_name, Guest, GuestId};
use crate::repo::greeting_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for the invited-guest list.
pub trait GuestRepository {
    /// Returns the first guest (lowest id) whose `user_name` matches `pattern`.
    fn find_guest(&self, pattern: &str) -> RepoResult<Option<Guest>>;
    /// Adds one guest and returns the stored row.
    fn insert_guest(&self, user_name: &str, display_name: &str) -> RepoResult<Guest>;
}

/// SQLite-backed guest repository.
pub struct SqliteGuestRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGuestRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !super::table_exists(conn, "guest")? {
            return Err(RepoError::MissingRequiredTable("guest"));
        }
        Ok(Self { conn })
    }
}

impl GuestRepository for SqliteGuestRepository<'_> {
    fn find_guest(&self, pattern: &str) -> RepoResult<Option<Guest>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, user_name, display_name
             FROM guest
             WHERE user_name_folded LIKE ?1
             ORDER BY id ASC
             LIMIT 1;",
        )?;

        let mut rows = stmt.query([fold_user_name(pattern)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_guest_row(row)?));
        }

        Ok(None)
    }

    fn insert_guest(&self, user_name: &str, display_name: &str) -> RepoResult<Guest> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO guest (user_name, user_name_folded, display_name)
             VALUES (?1, ?2, ?3)
             RETURNING id, created_at, user_name, display_name;",
        )?;

        let mut rows = stmt.query(params![
            user_name,
            fold_user_name(user_name),
            display_name
        ])?;
        if let Some(row) = rows.next()? {
            return parse_guest_row(row);
        }

        Err(RepoError::InvalidData(
            "insert into guest returned no row".to_string(),
        ))
    }
}

fn parse_guest_row(row: &Row<'_>) -> RepoResult<Guest> {
    let id: GuestId = row.get("id")?;
    let created_text: String = row.get("created_at")?;
    let created_at = parse_timestamp(&created_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{created_text}` in guest.created_at (id={id})"
        ))
    })?;

    Ok(Guest {
        id,
        created_at,
        user_name: row.get("user_name")?,
        display_name: row.get("display_name")?,
    })
}
