//! Guestbook use-case service.
//!
//! # Responsibility
//! - List the whole guestbook grouped by calendar day.
//! - Append one message and announce it to subscribers.
//! - Announce rows other connections inserted behind this process's back.
//!
//! # Invariants
//! - Store failures surface as `Err`; they never become an empty
//!   guestbook or a success acknowledgement.
//! - Only inserts that reached the store are announced.

use crate::model::greeting::{
    group_by_day, utc_offset, GreetingId, GuestMessage, Guestbook, NewGreeting,
};
use crate::notify::{GreetingEvent, InsertNotifier};
use crate::repo::greeting_repo::{GreetingRepository, RepoResult};
use chrono::FixedOffset;
use log::{debug, error, info};

/// Use-case service wrapper for guestbook operations.
pub struct GreetingService<R: GreetingRepository> {
    repo: R,
    day_offset: FixedOffset,
    notifier: Option<InsertNotifier>,
}

impl<R: GreetingRepository> GreetingService<R> {
    /// Creates a service grouping days in UTC and publishing nothing.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            day_offset: utc_offset(),
            notifier: None,
        }
    }

    /// Groups days as seen from `offset` instead of UTC.
    pub fn with_day_offset(mut self, offset: FixedOffset) -> Self {
        self.day_offset = offset;
        self
    }

    /// Publishes every successful append on `notifier`.
    pub fn with_notifier(mut self, notifier: InsertNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Returns all messages grouped by day, oldest day and message first.
    ///
    /// An empty store yields an empty map and a count of zero.
    pub fn list(&self) -> RepoResult<Guestbook> {
        let messages = self.repo.list_greetings().map_err(|err| {
            error!("event=greeting_list module=service status=error error={err}");
            err
        })?;
        let guestbook = group_by_day(messages, self.day_offset);
        debug!(
            "event=greeting_list module=service status=ok days={} messages={}",
            guestbook.greeting.len(),
            guestbook.number_greeting
        );
        Ok(guestbook)
    }

    /// Stores one message verbatim and returns the stored row.
    ///
    /// # Contract
    /// - No validation of field contents or lengths.
    /// - On success, subscribers receive `GreetingEvent::Inserted`.
    pub fn append(&self, entry: &NewGreeting) -> RepoResult<GuestMessage> {
        let stored = self.repo.insert_greeting(entry).map_err(|err| {
            error!("event=greeting_append module=service status=error error={err}");
            err
        })?;
        info!(
            "event=greeting_append module=service status=ok id={} is_confirm={}",
            stored.id, stored.is_confirm
        );

        if let Some(notifier) = &self.notifier {
            notifier.publish(GreetingEvent::Inserted(stored.clone()));
        }

        Ok(stored)
    }

    /// Highest id currently stored; the starting point for `announce_after`.
    pub fn latest_id(&self) -> RepoResult<GreetingId> {
        self.repo.latest_greeting_id()
    }

    /// Publishes every stored row with an id above `after` and returns the
    /// new high-water mark.
    ///
    /// Rows come out in id order, which is also commit order for
    /// `AUTOINCREMENT` keys. Without a notifier nothing is read and `after`
    /// is returned unchanged.
    pub fn announce_after(&self, after: GreetingId) -> RepoResult<GreetingId> {
        let Some(notifier) = &self.notifier else {
            return Ok(after);
        };

        let fresh = self.repo.list_greetings_after(after).map_err(|err| {
            error!("event=greeting_announce module=service status=error error={err}");
            err
        })?;

        let mut latest = after;
        for message in fresh {
            latest = latest.max(message.id);
            notifier.publish(GreetingEvent::Inserted(message));
        }
        if latest > after {
            info!(
                "event=greeting_announce module=service status=ok from_id={after} to_id={latest}"
            );
        }
        Ok(latest)
    }
}
