//! Guestbook repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the two guestbook operations over the `greeting` table:
//!   list everything, append one row.
//! - Read rows past a known id so inserts made by other connections can be
//!   announced.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `id` and `created_at` come from the store; inserts never bind them.
//! - Listing has no filter and no limit.

use crate::db::DbError;
use crate::model::greeting::{parse_timestamp, GreetingId, GuestMessage, NewGreeting};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const GREETING_COLUMNS: &str = "id, created_at, alias_name, is_confirm, message, id_user";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by guestbook and guest persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    /// The store handle cannot be used (e.g. a poisoned connection lock).
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::MissingRequiredTable(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for guestbook operations.
pub trait GreetingRepository {
    /// Returns every stored message, oldest first.
    fn list_greetings(&self) -> RepoResult<Vec<GuestMessage>>;
    /// Inserts one message verbatim and returns the stored row.
    fn insert_greeting(&self, entry: &NewGreeting) -> RepoResult<GuestMessage>;
    /// Returns messages whose id is greater than `after`, in id order.
    fn list_greetings_after(&self, after: GreetingId) -> RepoResult<Vec<GuestMessage>>;
    /// Highest stored id, or 0 for an empty table.
    fn latest_greeting_id(&self) -> RepoResult<GreetingId>;
}

/// SQLite-backed guestbook repository.
pub struct SqliteGreetingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGreetingRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - Returns `MissingRequiredTable` when the schema was not applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !super::table_exists(conn, "greeting")? {
            return Err(RepoError::MissingRequiredTable("greeting"));
        }
        Ok(Self { conn })
    }
}

impl GreetingRepository for SqliteGreetingRepository<'_> {
    fn list_greetings(&self) -> RepoResult<Vec<GuestMessage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GREETING_COLUMNS}
             FROM greeting
             ORDER BY created_at ASC, id ASC;"
        ))?;

        let mut rows = stmt.query([])?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            messages.push(parse_greeting_row(row)?);
        }

        Ok(messages)
    }

    fn insert_greeting(&self, entry: &NewGreeting) -> RepoResult<GuestMessage> {
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO greeting (alias_name, is_confirm, message, id_user)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {GREETING_COLUMNS};"
        ))?;

        let mut rows = stmt.query(params![
            entry.alias_name.as_str(),
            bool_to_int(entry.is_confirm),
            entry.message.as_str(),
            entry.id_user,
        ])?;

        if let Some(row) = rows.next()? {
            return parse_greeting_row(row);
        }

        Err(RepoError::InvalidData(
            "insert into greeting returned no row".to_string(),
        ))
    }

    fn list_greetings_after(&self, after: GreetingId) -> RepoResult<Vec<GuestMessage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GREETING_COLUMNS}
             FROM greeting
             WHERE id > ?1
             ORDER BY id ASC;"
        ))?;

        let mut rows = stmt.query([after])?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            messages.push(parse_greeting_row(row)?);
        }

        Ok(messages)
    }

    fn latest_greeting_id(&self) -> RepoResult<GreetingId> {
        let latest: GreetingId =
            self.conn
                .query_row("SELECT COALESCE(MAX(id), 0) FROM greeting;", [], |row| {
                    row.get(0)
                })?;
        Ok(latest)
    }
}

fn parse_greeting_row(row: &Row<'_>) -> RepoResult<GuestMessage> {
    let id: i64 = row.get("id")?;

    let created_text: String = row.get("created_at")?;
    let created_at = parse_timestamp(&created_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{created_text}` in greeting.created_at (id={id})"
        ))
    })?;

    let is_confirm = match row.get::<_, i64>("is_confirm")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_confirm value `{other}` in greeting.is_confirm (id={id})"
            )));
        }
    };

    Ok(GuestMessage {
        id,
        created_at,
        alias_name: row.get("alias_name")?,
        is_confirm,
        message: row.get("message")?,
        id_user: row.get("id_user")?,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
