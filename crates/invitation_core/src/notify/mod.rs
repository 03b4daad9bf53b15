//! Insert notification hub for the guestbook.
//!
//! # Responsibility
//! - Fan out "a message was inserted" events to every open subscriber.
//! - Tie each subscription's lifetime to a guard value.
//!
//! # Invariants
//! - Publishing never fails for lack of subscribers.
//! - Only successful inserts are published.
//! - A subscription is released exactly when its guard is dropped.

use crate::model::greeting::GuestMessage;
use log::{debug, info};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Default number of buffered events per subscriber before it lags.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Change pushed to subscribers of the guestbook table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GreetingEvent {
    Inserted(GuestMessage),
}

/// What a subscriber observes when it waits for the next change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Event(GreetingEvent),
    /// The subscriber fell behind and `n` events were dropped.
    Lagged(u64),
}

/// Cloneable publisher handle; every clone feeds the same subscribers.
#[derive(Debug, Clone)]
pub struct InsertNotifier {
    tx: broadcast::Sender<GreetingEvent>,
}

impl Default for InsertNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl InsertNotifier {
    /// Creates a hub buffering up to `capacity` events per subscriber.
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event and returns how many subscribers received it.
    pub fn publish(&self, event: GreetingEvent) -> usize {
        let delivered = self.tx.send(event).unwrap_or(0);
        debug!("event=greeting_publish module=notify status=ok subscribers={delivered}");
        delivered
    }

    /// Opens a new subscription that sees events published from now on.
    pub fn subscribe(&self) -> GreetingSubscription {
        let rx = self.tx.subscribe();
        info!(
            "event=subscription_open module=notify status=ok subscribers={}",
            self.tx.receiver_count()
        );
        GreetingSubscription { rx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Live subscription guard. Dropping it unsubscribes.
pub struct GreetingSubscription {
    rx: broadcast::Receiver<GreetingEvent>,
}

impl GreetingSubscription {
    /// Waits for the next change.
    ///
    /// Returns `None` once every publisher handle has been dropped.
    pub async fn next_event(&mut self) -> Option<SubscriptionEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(SubscriptionEvent::Event(event)),
            Err(RecvError::Lagged(skipped)) => {
                info!("event=subscription_lagged module=notify status=error skipped={skipped}");
                Some(SubscriptionEvent::Lagged(skipped))
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// Returns an already buffered change without waiting.
    pub fn try_next_event(&mut self) -> Option<SubscriptionEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(SubscriptionEvent::Event(event)),
            Err(TryRecvError::Lagged(skipped)) => Some(SubscriptionEvent::Lagged(skipped)),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }
}

impl Drop for GreetingSubscription {
    fn drop(&mut self) {
        info!("event=subscription_close module=notify status=ok");
    }
}

#[cfg(test)]
mod tests {
    use super::{GreetingEvent, InsertNotifier, SubscriptionEvent};
    use crate::model::greeting::{parse_timestamp, GuestMessage};

    fn inserted(id: i64) -> GreetingEvent {
        GreetingEvent::Inserted(GuestMessage {
            id,
            created_at: parse_timestamp("2024-05-01T09:00:00Z").unwrap(),
            alias_name: "Ani".to_string(),
            is_confirm: true,
            message: "Selamat!".to_string(),
            id_user: 1,
        })
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let notifier = InsertNotifier::default();
        assert_eq!(notifier.publish(inserted(1)), 0);
    }

    #[test]
    fn dropping_subscription_releases_it() {
        let notifier = InsertNotifier::new(4);
        let subscription = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_published_insert() {
        let notifier = InsertNotifier::new(4);
        let mut subscription = notifier.subscribe();
        assert_eq!(notifier.publish(inserted(5)), 1);

        let event = subscription.next_event().await;
        assert_eq!(event, Some(SubscriptionEvent::Event(inserted(5))));
    }

    #[tokio::test]
    async fn slow_subscriber_observes_lag() {
        let notifier = InsertNotifier::new(1);
        let mut subscription = notifier.subscribe();
        notifier.publish(inserted(1));
        notifier.publish(inserted(2));

        assert_eq!(
            subscription.next_event().await,
            Some(SubscriptionEvent::Lagged(1))
        );
        assert_eq!(
            subscription.next_event().await,
            Some(SubscriptionEvent::Event(inserted(2)))
        );
    }

    #[tokio::test]
    async fn closed_hub_ends_subscription() {
        let notifier = InsertNotifier::new(1);
        let mut subscription = notifier.subscribe();
        drop(notifier);
        assert_eq!(subscription.next_event().await, None);
    }
}
