//! Guest lookup use-case service.

use crate::model::guest::{Guest, GuestLookup};
use crate::repo::greeting_repo::RepoResult;
use crate::repo::guest_repo::GuestRepository;
use log::debug;

/// Use-case service over the invited-guest list.
pub struct GuestService<R: GuestRepository> {
    repo: R,
}

impl<R: GuestRepository> GuestService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Looks a guest up by user name. Surrounding whitespace is ignored,
    /// as it is when guests are added.
    ///
    /// Returns the guest flagged as invited, or the zeroed placeholder
    /// when nothing matches.
    pub fn lookup(&self, username: &str) -> RepoResult<GuestLookup> {
        let found = self.repo.find_guest(username.trim())?;
        debug!(
            "event=guest_lookup module=service status=ok found={}",
            found.is_some()
        );
        Ok(found.map_or_else(GuestLookup::not_invited, GuestLookup::invited))
    }

    /// Adds one guest to the invited list.
    pub fn add_guest(&self, user_name: &str, display_name: &str) -> RepoResult<Guest> {
        self.repo.insert_guest(user_name.trim(), display_name.trim())
    }
}
