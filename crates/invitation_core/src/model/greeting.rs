//! Guestbook message model and day grouping.
//!
//! # Responsibility
//! - Define `GuestMessage` (stored row) and `NewGreeting` (append input).
//! - Fold chronologically sorted messages into day-labelled groups.
//!
//! # Invariants
//! - Groups appear in the order their first message is encountered after
//!   the chronological sort, which is ascending by date.
//! - Within a group, messages are non-decreasing by `created_at`.
//! - `number_greeting` always equals the sum of all group sizes.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Store-assigned message identifier.
pub type GreetingId = i64;

/// `strftime` pattern for day labels, e.g. `01 May 2024`.
pub const DAY_LABEL_FORMAT: &str = "%d %b %Y";

/// One persisted guestbook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestMessage {
    /// Unique, assigned by the store on insert.
    pub id: GreetingId,
    /// Assigned by the store on insert.
    pub created_at: DateTime<Utc>,
    /// Guest-supplied display name; may be empty.
    pub alias_name: String,
    /// Attendance flag.
    pub is_confirm: bool,
    /// Free-form note; may be empty.
    pub message: String,
    /// Submitter identifier supplied by the client.
    pub id_user: i64,
}

/// Append input: everything except the store-assigned fields.
///
/// Only the JSON type shape is checked. Empty names and messages are
/// stored as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGreeting {
    #[serde(default)]
    pub alias_name: String,
    #[serde(default = "default_is_confirm")]
    pub is_confirm: bool,
    #[serde(default)]
    pub message: String,
    pub id_user: i64,
}

fn default_is_confirm() -> bool {
    true
}

/// Day-grouped read view of the whole guestbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guestbook {
    /// Day label -> messages of that day in chronological order.
    pub greeting: IndexMap<String, Vec<GuestMessage>>,
    /// Total message count across all days.
    #[serde(rename = "numberGreeting")]
    pub number_greeting: usize,
}

impl Guestbook {
    /// Iterates over every message in display order.
    pub fn messages(&self) -> impl Iterator<Item = &GuestMessage> {
        self.greeting.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.number_greeting == 0
    }
}

/// Formats the calendar day of `ts` as seen from `offset`.
pub fn day_label(ts: &DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format(DAY_LABEL_FORMAT).to_string()
}

/// Sorts messages by `created_at` and groups them by day label.
///
/// The sort is stable, so messages sharing a timestamp keep their input
/// order (the store returns them by ascending id).
pub fn group_by_day(mut messages: Vec<GuestMessage>, offset: FixedOffset) -> Guestbook {
    messages.sort_by_key(|message| message.created_at);
    let number_greeting = messages.len();

    let mut greeting: IndexMap<String, Vec<GuestMessage>> = IndexMap::new();
    for message in messages {
        greeting
            .entry(day_label(&message.created_at, offset))
            .or_default()
            .push(message);
    }

    Guestbook {
        greeting,
        number_greeting,
    }
}

/// Returns the UTC offset used when no day offset is configured.
pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Builds a day offset from whole minutes east of UTC.
///
/// Returns `None` outside the open range of one day.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
}

/// Parses a persisted timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T09:00:00.000Z`, `2024-05-01T16:00:00+07:00`)
/// and zone-less SQLite forms (`2024-05-01 09:00:00`), the latter read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(trimmed, pattern).ok())
        .map(|naive| naive.and_utc())
}
