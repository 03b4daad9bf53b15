//! Async driver binding a [`GuestbookView`] to a guestbook source.
//!
//! One session corresponds to one open page: it subscribes to inserts,
//! loads the guestbook on open, reloads when an insert is announced and
//! submits the form. Reloads after a submit go through the notification
//! path only.

use std::future::Future;

use invitation_core::{
    GreetingSubscription, GuestMessage, Guestbook, GuestbookView, NewGreeting, ReadOutcome,
    RepoResult,
};
use log::{debug, info, warn};

use crate::state::AppState;

/// Where a session reads, writes and hears about inserts.
pub trait GuestbookSource {
    fn list(&self) -> impl Future<Output = RepoResult<Guestbook>> + Send;
    fn append(&self, entry: NewGreeting) -> impl Future<Output = RepoResult<GuestMessage>> + Send;
    fn subscribe(&self) -> GreetingSubscription;
}

impl GuestbookSource for AppState {
    fn list(&self) -> impl Future<Output = RepoResult<Guestbook>> + Send {
        let state = self.clone();
        async move { state.blocking(|state| state.list_greetings()).await }
    }

    fn append(&self, entry: NewGreeting) -> impl Future<Output = RepoResult<GuestMessage>> + Send {
        let state = self.clone();
        async move {
            state
                .blocking(move |state| state.append_greeting(&entry))
                .await
        }
    }

    fn subscribe(&self) -> GreetingSubscription {
        self.notifier().subscribe()
    }
}

pub struct GuestbookSession<S: GuestbookSource> {
    source: S,
    view: GuestbookView,
    subscription: Option<GreetingSubscription>,
}

impl<S: GuestbookSource> GuestbookSession<S> {
    /// Subscribes to inserts, then performs the initial load.
    ///
    /// Subscribing first means no insert can slip between the load and
    /// the subscription.
    pub async fn open(source: S) -> Self {
        let subscription = source.subscribe();
        let mut view = GuestbookView::new();
        view.activate();

        let mut session = Self {
            source,
            view,
            subscription: Some(subscription),
        };
        session.refresh().await;
        info!("event=session_open module=session status=ok");
        session
    }

    pub fn view(&self) -> &GuestbookView {
        &self.view
    }

    /// Form editing goes through the view.
    pub fn view_mut(&mut self) -> &mut GuestbookView {
        &mut self.view
    }

    /// Waits for the next insert announcement and reloads.
    ///
    /// Announcements already queued are folded into the same reload.
    /// Returns `false` when the session is closed or the channel ended.
    pub async fn next_change(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        if subscription.next_event().await.is_none() {
            return false;
        }
        self.view.on_insert();

        let mut coalesced = 0usize;
        while subscription.try_next_event().is_some() {
            self.view.on_insert();
            coalesced += 1;
        }
        debug!("event=session_change module=session status=ok coalesced={coalesced}");

        self.refresh().await;
        true
    }

    /// Submits the current form. The form is cleared whatever the outcome.
    pub async fn submit(&mut self) -> RepoResult<GuestMessage> {
        let entry = self.view.submit();
        let result = self.source.append(entry).await;
        if let Err(err) = &result {
            warn!("event=session_submit module=session status=error error={err}");
        }
        result
    }

    /// Releases the subscription and stops the view.
    pub fn close(mut self) {
        self.view.deactivate();
        self.subscription.take();
        info!("event=session_close module=session status=ok");
    }

    async fn refresh(&mut self) {
        while let Some(ticket) = self.view.poll_read() {
            let result = self.source.list().await.map_err(|err| err.to_string());
            if self.view.complete_read(ticket, result) == ReadOutcome::Failed {
                warn!("event=session_refresh module=session status=error");
                break;
            }
        }
    }
}
