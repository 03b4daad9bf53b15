//! Shared application state injected into every handler.
//!
//! The SQLite connection is opened once at startup and shared behind a
//! mutex; each request builds its repository and service on top of it.
//!
//! Next to the connection the state remembers the highest greeting id it
//! has announced. Rows above that mark were written by another process
//! (the CLI, a second server) and are announced by
//! [`AppState::sync_external_inserts`] before they can be overtaken by a
//! local append.

use std::sync::{Arc, Mutex};

use chrono::FixedOffset;
use invitation_core::db::data_version;
use invitation_core::{
    utc_offset, GreetingId, GreetingRepository, GreetingService, GuestLookup, GuestMessage,
    GuestService, Guestbook, InsertNotifier, NewGreeting, RepoError, RepoResult,
    SqliteGreetingRepository, SqliteGuestRepository,
};
use log::warn;
use rusqlite::Connection;
use tokio::sync::watch;

struct Store {
    conn: Connection,
    /// Highest greeting id already published on the notifier.
    announced_through: GreetingId,
    /// `PRAGMA data_version` seen by the last successful sync.
    data_version: Option<i64>,
}

impl Store {
    fn new(conn: Connection) -> Self {
        let announced_through = SqliteGreetingRepository::try_new(&conn)
            .and_then(|repo| repo.latest_greeting_id())
            .unwrap_or_else(|err| {
                warn!("event=insert_sync module=state status=error error={err}");
                0
            });
        Self {
            conn,
            announced_through,
            data_version: None,
        }
    }

    /// Publishes rows other connections committed since the last sync.
    fn announce_external(&mut self, notifier: &InsertNotifier) -> RepoResult<()> {
        let version = data_version(&self.conn)?;
        if self.data_version == Some(version) {
            return Ok(());
        }

        let service = GreetingService::new(SqliteGreetingRepository::try_new(&self.conn)?)
            .with_notifier(notifier.clone());
        self.announced_through = service.announce_after(self.announced_through)?;
        self.data_version = Some(version);
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Store>>,
    notifier: InsertNotifier,
    day_offset: FixedOffset,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Wraps a migrated connection. Days are grouped in UTC.
    pub fn new(conn: Connection, notifier: InsertNotifier) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            db: Arc::new(Mutex::new(Store::new(conn))),
            notifier,
            day_offset: utc_offset(),
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn with_day_offset(mut self, day_offset: FixedOffset) -> Self {
        self.day_offset = day_offset;
        self
    }

    pub fn notifier(&self) -> &InsertNotifier {
        &self.notifier
    }

    /// Asks long-lived responses (push streams) to finish.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn list_greetings(&self) -> RepoResult<Guestbook> {
        self.with_conn(|conn| {
            GreetingService::new(SqliteGreetingRepository::try_new(conn)?)
                .with_day_offset(self.day_offset)
                .list()
        })
    }

    /// Stores `entry` and announces it.
    ///
    /// Pending inserts from other connections are announced first so
    /// subscribers see rows in id order.
    pub fn append_greeting(&self, entry: &NewGreeting) -> RepoResult<GuestMessage> {
        self.with_store(|store| {
            if let Err(err) = store.announce_external(&self.notifier) {
                warn!("event=insert_sync module=state status=error error={err}");
            }

            let stored = GreetingService::new(SqliteGreetingRepository::try_new(&store.conn)?)
                .with_notifier(self.notifier.clone())
                .append(entry)?;
            store.announced_through = store.announced_through.max(stored.id);
            Ok(stored)
        })
    }

    /// Announces greetings inserted by other processes since the last call.
    pub fn sync_external_inserts(&self) -> RepoResult<()> {
        self.with_store(|store| store.announce_external(&self.notifier))
    }

    pub fn lookup_guest(&self, username: &str) -> RepoResult<GuestLookup> {
        self.with_conn(|conn| GuestService::new(SqliteGuestRepository::try_new(conn)?).lookup(username))
    }

    /// Runs `f` on the blocking pool so SQLite work never stalls the reactor.
    pub async fn blocking<T, F>(&self, f: F) -> RepoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&AppState) -> RepoResult<T> + Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state))
            .await
            .map_err(|err| RepoError::Unavailable(format!("store task failed: {err}")))?
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        self.with_store(|store| f(&store.conn))
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> RepoResult<T>) -> RepoResult<T> {
        let mut store = self
            .db
            .lock()
            .map_err(|_| RepoError::Unavailable("connection lock poisoned".to_string()))?;
        f(&mut store)
    }
}
