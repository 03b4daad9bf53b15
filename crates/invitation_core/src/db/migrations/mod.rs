//! Schema history of the invitation store.
//!
//! Each step is a SQL file plus an optional Rust backfill for data SQLite
//! cannot compute itself (Unicode case folding). The schema version lives
//! in `PRAGMA user_version`; all pending steps commit together or not at
//! all.

use crate::db::{DbError, DbResult};
use crate::model::guest::fold_user_name;
use log::{debug, info};
use rusqlite::{Connection, Transaction};

type Backfill = fn(&Transaction<'_>) -> DbResult<()>;

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
    backfill: Option<Backfill>,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "greeting",
        sql: include_str!("0001_greeting.sql"),
        backfill: None,
    },
    Step {
        version: 2,
        name: "guest",
        sql: include_str!("0002_guest.sql"),
        backfill: None,
    },
    Step {
        version: 3,
        name: "guest_folded_name",
        sql: include_str!("0003_guest_folded_name.sql"),
        backfill: Some(fold_existing_guest_names),
    },
    Step {
        version: 4,
        name: "guest_folded_name_index",
        sql: include_str!("0004_guest_folded_name_index.sql"),
        backfill: None,
    },
];

/// Newest schema version this build can write.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `SchemaTooNew` when the file already carries a later version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = user_version(conn)?;
    let supported = latest_version();

    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }
    if found == supported {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in STEPS.iter().filter(|step| step.version > found) {
        debug!(
            "event=db_migrate module=db status=start version={} name={}",
            step.version, step.name
        );
        tx.execute_batch(step.sql)?;
        if let Some(backfill) = step.backfill {
            backfill(&tx)?;
        }
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={found} to_version={supported}");
    Ok(())
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}

fn fold_existing_guest_names(tx: &Transaction<'_>) -> DbResult<()> {
    let names = {
        let mut stmt = tx.prepare("SELECT id, user_name FROM guest;")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut update = tx.prepare("UPDATE guest SET user_name_folded = ?1 WHERE id = ?2;")?;
    for (id, user_name) in &names {
        update.execute(rusqlite::params![fold_user_name(user_name), id])?;
    }
    Ok(())
}
