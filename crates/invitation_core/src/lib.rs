//! Core domain logic for the wedding invitation site.
//! This crate is the single source of truth for guestbook invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod view;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::greeting::{
    day_label, group_by_day, offset_from_minutes, parse_timestamp, utc_offset, GreetingId,
    GuestMessage, Guestbook, NewGreeting,
};
pub use model::guest::{fold_user_name, Guest, GuestId, GuestLookup};
pub use notify::{
    GreetingEvent, GreetingSubscription, InsertNotifier, SubscriptionEvent,
    DEFAULT_EVENT_CAPACITY,
};
pub use repo::greeting_repo::{
    GreetingRepository, RepoError, RepoResult, SqliteGreetingRepository,
};
pub use repo::guest_repo::{GuestRepository, SqliteGuestRepository};
pub use service::greeting_service::GreetingService;
pub use service::guest_service::GuestService;
pub use view::guestbook_view::{
    GreetingForm, GuestbookView, ReadOutcome, ReadTicket, ViewState, PLACEHOLDER_USER_ID,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
