//! Invitation store: connection setup, schema versions and change probes.
//!
//! Every connection handed out by [`open_db`] or [`open_db_in_memory`] is
//! already on the newest schema, so repositories never see a half-built
//! store.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build of the site.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "store schema v{found} is newer than this build understands (v{supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Counter that moves whenever *another* connection commits to the file.
///
/// Commits made through `conn` itself leave it unchanged, which makes it a
/// cheap test for "someone else wrote". In-memory stores are private to
/// their connection, so the value never moves there.
pub fn data_version(conn: &Connection) -> DbResult<i64> {
    let version = conn.query_row("PRAGMA data_version;", [], |row| row.get(0))?;
    Ok(version)
}
