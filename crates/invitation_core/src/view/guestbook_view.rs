//! Guestbook view state machine.
//!
//! # Responsibility
//! - Decide when the guestbook must be re-read (activation, insert
//!   notifications) and which read responses may update the view.
//! - Hold the submission form and turn it into an append request.
//!
//! # Invariants
//! - At most one read is in flight; notifications arriving meanwhile
//!   coalesce into a single follow-up read.
//! - Only the response to the most recently issued read is applied;
//!   anything else is reported as `Stale` and dropped.
//! - `submit` clears the form whatever the append outcome turns out to be.
//! - New messages only become visible through a completed read.

use crate::model::greeting::{Guestbook, NewGreeting};

/// Submitter id sent with every append; there is no per-guest identity yet.
pub const PLACEHOLDER_USER_ID: i64 = 1;

/// Lifecycle of one open view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Not activated yet, or deactivated.
    Idle,
    /// A read is in flight.
    Loading,
    /// Holds the result of the last completed read.
    Loaded,
}

/// Handle for one issued read; hand it back to `complete_read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket {
    seq: u64,
}

impl ReadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What `complete_read` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The guestbook was replaced.
    Applied,
    /// The read failed; the previous guestbook stays visible.
    Failed,
    /// The response was superseded and ignored.
    Stale,
}

/// Submission form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingForm {
    pub name: String,
    pub is_present: bool,
    pub message: String,
}

impl Default for GreetingForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_present: true,
            message: String::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct GuestbookView {
    guestbook: Guestbook,
    last_error: Option<String>,
    form: GreetingForm,
    active: bool,
    loaded_once: bool,
    refresh_pending: bool,
    in_flight: Option<u64>,
    last_seq: u64,
}

impl GuestbookView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewState {
        if !self.active {
            ViewState::Idle
        } else if self.in_flight.is_some() {
            ViewState::Loading
        } else if self.loaded_once {
            ViewState::Loaded
        } else {
            ViewState::Idle
        }
    }

    /// Starts the view; the first `poll_read` then issues the initial read.
    ///
    /// Activating an already active view is a no-op.
    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.refresh_pending = true;
    }

    /// Stops the view. Responses to reads issued before this become stale.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.refresh_pending = false;
        self.in_flight = None;
    }

    /// Records that the store announced an insert.
    pub fn on_insert(&mut self) {
        if self.active {
            self.refresh_pending = true;
        }
    }

    pub fn is_refresh_pending(&self) -> bool {
        self.refresh_pending
    }

    /// Issues the next read when one is due and none is in flight.
    pub fn poll_read(&mut self) -> Option<ReadTicket> {
        if !self.active || !self.refresh_pending || self.in_flight.is_some() {
            return None;
        }

        self.last_seq += 1;
        self.in_flight = Some(self.last_seq);
        self.refresh_pending = false;
        Some(ReadTicket { seq: self.last_seq })
    }

    /// Applies the response for `ticket` if it is still the current read.
    pub fn complete_read(
        &mut self,
        ticket: ReadTicket,
        result: Result<Guestbook, String>,
    ) -> ReadOutcome {
        if self.in_flight != Some(ticket.seq) {
            return ReadOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(guestbook) => {
                self.guestbook = guestbook;
                self.last_error = None;
                self.loaded_once = true;
                ReadOutcome::Applied
            }
            Err(message) => {
                self.last_error = Some(message);
                ReadOutcome::Failed
            }
        }
    }

    pub fn guestbook(&self) -> &Guestbook {
        &self.guestbook
    }

    /// Total messages currently shown.
    pub fn number_greeting(&self) -> usize {
        self.guestbook.number_greeting
    }

    /// Error message of the last failed read, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn form(&self) -> &GreetingForm {
        &self.form
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.form.message = message.into();
    }

    pub fn set_presence(&mut self, is_present: bool) {
        self.form.is_present = is_present;
    }

    pub fn toggle_presence(&mut self) {
        self.form.is_present = !self.form.is_present;
    }

    /// Takes the form contents as an append request and resets the form.
    pub fn submit(&mut self) -> NewGreeting {
        let form = std::mem::take(&mut self.form);
        NewGreeting {
            alias_name: form.name,
            is_confirm: form.is_present,
            message: form.message,
            id_user: PLACEHOLDER_USER_ID,
        }
    }
}
