use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use invitation_core::db::open_db_in_memory;
use invitation_core::{
    GreetingSubscription, GuestMessage, Guestbook, InsertNotifier, NewGreeting, RepoError,
    RepoResult, ViewState, PLACEHOLDER_USER_ID,
};
use invitation_server::session::{GuestbookSession, GuestbookSource};
use invitation_server::state::AppState;

fn state() -> AppState {
    AppState::new(open_db_in_memory().unwrap(), InsertNotifier::new(16))
}

fn greeting(name: &str, message: &str) -> NewGreeting {
    NewGreeting {
        alias_name: name.to_string(),
        is_confirm: true,
        message: message.to_string(),
        id_user: PLACEHOLDER_USER_ID,
    }
}

async fn wait_for_change<S: GuestbookSource>(session: &mut GuestbookSession<S>) -> bool {
    tokio::time::timeout(Duration::from_secs(5), session.next_change())
        .await
        .expect("insert announcement should arrive")
}

#[tokio::test]
async fn open_loads_existing_messages() {
    let state = state();
    state.append_greeting(&greeting("Ani", "Selamat!")).unwrap();

    let session = GuestbookSession::open(state.clone()).await;

    assert_eq!(session.view().state(), ViewState::Loaded);
    assert_eq!(session.view().number_greeting(), 1);
    assert_eq!(state.notifier().subscriber_count(), 1);
}

#[tokio::test]
async fn insert_from_another_page_triggers_reload() {
    let state = state();
    let mut session = GuestbookSession::open(state.clone()).await;
    assert_eq!(session.view().number_greeting(), 0);

    state.append_greeting(&greeting("Budi", "Bahagia selalu")).unwrap();

    assert!(wait_for_change(&mut session).await);
    assert_eq!(session.view().number_greeting(), 1);
}

#[tokio::test]
async fn queued_announcements_fold_into_one_reload() {
    let state = state();
    let source = CountingSource::new(state.clone());
    let mut session = GuestbookSession::open(source.clone()).await;
    assert_eq!(source.reads(), 1);

    state.append_greeting(&greeting("Ani", "satu")).unwrap();
    state.append_greeting(&greeting("Budi", "dua")).unwrap();
    state.append_greeting(&greeting("Cici", "tiga")).unwrap();

    assert!(wait_for_change(&mut session).await);
    assert_eq!(source.reads(), 2);
    assert_eq!(session.view().number_greeting(), 3);
}

#[tokio::test]
async fn lagged_subscription_still_reloads() {
    let state = AppState::new(open_db_in_memory().unwrap(), InsertNotifier::new(1));
    let mut session = GuestbookSession::open(state.clone()).await;

    state.append_greeting(&greeting("Ani", "satu")).unwrap();
    state.append_greeting(&greeting("Budi", "dua")).unwrap();
    state.append_greeting(&greeting("Cici", "tiga")).unwrap();

    assert!(wait_for_change(&mut session).await);
    assert_eq!(session.view().number_greeting(), 3);
    assert!(session.view().last_error().is_none());
}

#[tokio::test]
async fn submitted_message_shows_up_after_announcement() {
    let state = state();
    let mut session = GuestbookSession::open(state.clone()).await;

    session.view_mut().set_name("Cici");
    session.view_mut().set_message("Sampai nanti!");
    let stored = session.submit().await.unwrap();

    assert_eq!(stored.alias_name, "Cici");
    assert_eq!(stored.id_user, PLACEHOLDER_USER_ID);
    assert!(session.view().form().name.is_empty());
    assert_eq!(session.view().number_greeting(), 0);

    assert!(wait_for_change(&mut session).await);
    let shown: Vec<&GuestMessage> = session.view().guestbook().messages().collect();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].id, stored.id);
}

#[tokio::test]
async fn failing_source_keeps_error_visible() {
    let notifier = InsertNotifier::new(4);
    let mut session = GuestbookSession::open(BrokenSource {
        notifier: notifier.clone(),
    })
    .await;

    assert!(session.view().last_error().is_some());
    assert_eq!(session.view().number_greeting(), 0);

    session.view_mut().set_message("hello");
    assert!(session.submit().await.is_err());
    assert!(session.view().form().message.is_empty());
}

#[tokio::test]
async fn close_releases_subscription() {
    let state = state();
    let session = GuestbookSession::open(state.clone()).await;
    assert_eq!(state.notifier().subscriber_count(), 1);

    session.close();

    assert_eq!(state.notifier().subscriber_count(), 0);
}

#[derive(Clone)]
struct CountingSource {
    inner: AppState,
    reads: Arc<AtomicUsize>,
}

impl CountingSource {
    fn new(inner: AppState) -> Self {
        Self {
            inner,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl GuestbookSource for CountingSource {
    fn list(&self) -> impl Future<Output = RepoResult<Guestbook>> + Send {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list()
    }

    fn append(&self, entry: NewGreeting) -> impl Future<Output = RepoResult<GuestMessage>> + Send {
        self.inner.append(entry)
    }

    fn subscribe(&self) -> GreetingSubscription {
        self.inner.subscribe()
    }
}

struct BrokenSource {
    notifier: InsertNotifier,
}

impl GuestbookSource for BrokenSource {
    fn list(&self) -> impl Future<Output = RepoResult<Guestbook>> + Send {
        async { Err(RepoError::Unavailable("store offline".to_string())) }
    }

    fn append(&self, _entry: NewGreeting) -> impl Future<Output = RepoResult<GuestMessage>> + Send {
        async { Err(RepoError::Unavailable("store offline".to_string())) }
    }

    fn subscribe(&self) -> GreetingSubscription {
        self.notifier.subscribe()
    }
}
