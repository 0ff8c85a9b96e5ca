//! Change notifications for the formations table.
//!
//! Events are re-fetch triggers, not deltas: delivery is at-least-once and
//! may arrive before or after the caller's own mutation has returned.

use tokio::sync::broadcast;
use tracing::{debug, trace};

/// The kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A row changed through this process.
    Row {
        /// What happened to the row.
        kind: ChangeKind,
        /// The affected formation.
        id: String,
    },
    /// Another process committed to the database.
    External,
    /// The subscriber fell behind and missed events.
    Resync,
}

/// Fan-out of change events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Create a feed buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Deliver an event to every current subscriber.
    pub fn publish(&self, event: ChangeEvent) {
        // No subscribers is not an error.
        match self.tx.send(event) {
            Ok(count) => trace!("Change delivered to {} subscribers", count),
            Err(broadcast::error::SendError(event)) => {
                trace!("Change {:?} dropped, no subscribers", event);
            }
        }
    }

    /// Register a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeSubscription {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    /// Wait for the next event.
    ///
    /// Returns `None` once the feed is gone. Missed events collapse into a
    /// single [`ChangeEvent::Resync`].
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!("Change subscriber lagged by {} events", missed);
                Some(ChangeEvent::Resync)
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(id: &str) -> ChangeEvent {
        ChangeEvent::Row {
            kind: ChangeKind::Insert,
            id: id.to_string(),
        }
    }

    #[test]
    fn test_change_kind_display() {
        assert_eq!(ChangeKind::Insert.to_string(), "insert");
        assert_eq!(ChangeKind::Update.to_string(), "update");
        assert_eq!(ChangeKind::Delete.to_string(), "delete");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let feed = ChangeFeed::new(4);
        feed.publish(insert("a"));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let feed = ChangeFeed::new(4);
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        feed.publish(insert("a"));

        assert_eq!(first.recv().await, Some(insert("a")));
        assert_eq!(second.recv().await, Some(insert("a")));
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let feed = ChangeFeed::new(4);
        let subscription = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_gets_resync() {
        let feed = ChangeFeed::new(2);
        let mut subscription = feed.subscribe();

        for id in ["a", "b", "c", "d"] {
            feed.publish(insert(id));
        }

        assert_eq!(subscription.recv().await, Some(ChangeEvent::Resync));
        assert_eq!(subscription.recv().await, Some(insert("c")));
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = ChangeFeed::new(2);
        let mut subscription = feed.subscribe();
        drop(feed);

        assert_eq!(subscription.recv().await, None);
    }
}
