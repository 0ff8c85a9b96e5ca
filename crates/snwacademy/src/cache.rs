//! Process-wide formations cache.
//!
//! Views never subscribe to the store themselves. They attach to a
//! [`FormationsCache`], which holds a single store subscription for as long
//! as at least one view is attached and re-fetches the cached queries on
//! every change. Each query result is published through a
//! [`tokio::sync::watch`] channel that views read from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::feed::{ChangeEvent, ChangeSubscription};
use crate::formation::{Formation, FormationLink};
use crate::storage::FormationStore;

/// The latest result of a cached query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot<T> {
    /// No fetch has completed yet.
    Loading,
    /// The last fetch succeeded.
    Ready(Arc<Vec<T>>),
    /// The last fetch failed; the list is considered empty.
    Failed(String),
}

impl<T> Snapshot<T> {
    /// The rows, or an empty slice while loading or after a failure.
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::Ready(items) => items,
            Self::Loading | Self::Failed(_) => &[],
        }
    }

    /// Whether a fetch has completed successfully.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Shared cache of formation queries with reference-counted subscribers.
#[derive(Clone)]
pub struct FormationsCache {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn FormationStore>,
    catalog: Query<Formation>,
    links: Query<FormationLink>,
    relay: Mutex<Relay>,
}

/// One cached query. Fetches take a ticket before reading, and a result is
/// only published if no later ticket has been published already.
struct Query<T> {
    tx: watch::Sender<Snapshot<T>>,
    issued: AtomicU64,
    published: AtomicU64,
}

impl<T: Clone> Query<T> {
    fn new() -> Self {
        let (tx, _) = watch::channel(Snapshot::Loading);
        Self {
            tx,
            issued: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Publish the result of fetch `ticket` and return the current snapshot.
    fn publish(&self, ticket: u64, snapshot: Snapshot<T>) -> Snapshot<T> {
        // The closure runs under the channel's write lock.
        let fresh = self.tx.send_if_modified(|current| {
            if ticket <= self.published.load(Ordering::Relaxed) {
                return false;
            }
            self.published.store(ticket, Ordering::Relaxed);
            *current = snapshot;
            true
        });
        if !fresh {
            trace!("Dropped stale fetch result (ticket {})", ticket);
        }
        self.tx.borrow().clone()
    }
}

#[derive(Default)]
struct Relay {
    attached: usize,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FormationsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormationsCache")
            .field("attached", &self.attached())
            .field("relay_running", &self.relay_running())
            .finish_non_exhaustive()
    }
}

impl FormationsCache {
    /// Create a cache over `store`. Nothing is fetched until asked.
    #[must_use]
    pub fn new(store: Arc<dyn FormationStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                catalog: Query::new(),
                links: Query::new(),
                relay: Mutex::new(Relay::default()),
            }),
        }
    }

    /// The underlying store, for mutations.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn FormationStore> {
        &self.inner.store
    }

    /// Register a subscriber.
    ///
    /// The first attachment subscribes to the store and starts the relay
    /// task; dropping the last one stops it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn attach(&self) -> CacheAttachment {
        let mut relay = self.inner.relay.lock().unwrap_or_else(PoisonError::into_inner);
        relay.attached += 1;
        if relay.task.is_none() {
            debug!("First subscriber attached, starting change relay");
            let changes = self.inner.store.subscribe();
            relay.task = Some(tokio::spawn(run_relay(
                Arc::downgrade(&self.inner),
                changes,
            )));
        }
        trace!("Cache subscribers: {}", relay.attached);

        CacheAttachment {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of live attachments.
    #[must_use]
    pub fn attached(&self) -> usize {
        self.inner
            .relay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attached
    }

    /// Whether the relay currently holds a store subscription.
    #[must_use]
    pub fn relay_running(&self) -> bool {
        self.inner
            .relay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .task
            .is_some()
    }

    /// Receiver for the full catalog query.
    #[must_use]
    pub fn watch_catalog(&self) -> watch::Receiver<Snapshot<Formation>> {
        self.inner.catalog.tx.subscribe()
    }

    /// Receiver for the `{id, title}` links query.
    #[must_use]
    pub fn watch_links(&self) -> watch::Receiver<Snapshot<FormationLink>> {
        self.inner.links.tx.subscribe()
    }

    /// Current catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> Snapshot<Formation> {
        self.inner.catalog.tx.borrow().clone()
    }

    /// Current links snapshot.
    #[must_use]
    pub fn links(&self) -> Snapshot<FormationLink> {
        self.inner.links.tx.borrow().clone()
    }

    /// Re-run `list_all` and publish the result.
    ///
    /// Returns the snapshot left in place afterwards. When refreshes
    /// overlap, a fetch that started earlier never replaces the result of
    /// one that started later.
    pub async fn refresh_catalog(&self) -> Snapshot<Formation> {
        self.inner.refresh_catalog().await
    }

    /// Re-run the links projection and publish the result.
    pub async fn refresh_links(&self) -> Snapshot<FormationLink> {
        self.inner.refresh_links().await
    }
}

impl Inner {
    async fn refresh_catalog(&self) -> Snapshot<Formation> {
        let ticket = self.catalog.ticket();
        let snapshot = match self.store.list_all().await {
            Ok(rows) => {
                trace!("Catalog refreshed with {} formations", rows.len());
                Snapshot::Ready(Arc::new(rows))
            }
            Err(e) => {
                warn!("Error fetching formations: {}", e);
                Snapshot::Failed(e.to_string())
            }
        };
        self.catalog.publish(ticket, snapshot)
    }

    async fn refresh_links(&self) -> Snapshot<FormationLink> {
        let ticket = self.links.ticket();
        let snapshot = match self.store.list_links().await {
            Ok(rows) => Snapshot::Ready(Arc::new(rows)),
            Err(e) => {
                warn!("Error fetching formations for footer: {}", e);
                Snapshot::Failed(e.to_string())
            }
        };
        self.links.publish(ticket, snapshot)
    }

    /// Refresh every query that somebody is watching.
    async fn refresh_watched(&self) {
        if self.catalog.tx.receiver_count() > 0 {
            self.refresh_catalog().await;
        }
        if self.links.tx.receiver_count() > 0 {
            self.refresh_links().await;
        }
    }
}

async fn run_relay(inner: Weak<Inner>, mut changes: ChangeSubscription) {
    while let Some(event) = changes.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        match &event {
            ChangeEvent::Row { kind, id } => debug!("Change received: {} {}", kind, id),
            ChangeEvent::External => debug!("Change received from another client"),
            ChangeEvent::Resync => debug!("Change feed lagged, resyncing"),
        }
        inner.refresh_watched().await;
    }
    debug!("Change relay stopped");
}

/// A view's claim on the cache relay. Dropping it detaches.
pub struct CacheAttachment {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CacheAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAttachment").finish_non_exhaustive()
    }
}

impl Drop for CacheAttachment {
    fn drop(&mut self) {
        let mut relay = self.inner.relay.lock().unwrap_or_else(PoisonError::into_inner);
        relay.attached = relay.attached.saturating_sub(1);
        if relay.attached == 0 {
            if let Some(task) = relay.task.take() {
                debug!("Last subscriber detached, stopping change relay");
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::auth::{AdminSession, SessionStore};
    use crate::error::Result;
    use crate::formation::{FormationField, FormationForm, NewFormation, PartialFormation};
    use crate::storage::SqliteStore;

    /// Holds the result of its first `list_all` until released, so a later
    /// refresh can overtake it.
    struct DelayedFirstRead {
        inner: Arc<SqliteStore>,
        delayed: AtomicBool,
        read: Notify,
        release: Notify,
    }

    impl DelayedFirstRead {
        fn new(inner: Arc<SqliteStore>) -> Self {
            Self {
                inner,
                delayed: AtomicBool::new(false),
                read: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl FormationStore for DelayedFirstRead {
        async fn list_all(&self) -> Result<Vec<Formation>> {
            let rows = self.inner.list_all().await;
            if !self.delayed.swap(true, Ordering::SeqCst) {
                self.read.notify_one();
                self.release.notified().await;
            }
            rows
        }

        async fn list_projection(
            &self,
            fields: &[FormationField],
        ) -> Result<Vec<PartialFormation>> {
            self.inner.list_projection(fields).await
        }

        async fn insert(&self, session: &AdminSession, new: NewFormation) -> Result<Formation> {
            self.inner.insert(session, new).await
        }

        async fn delete(&self, session: &AdminSession, id: &str) -> Result<()> {
            self.inner.delete(session, id).await
        }

        fn subscribe(&self) -> ChangeSubscription {
            self.inner.subscribe()
        }
    }

    fn titles(snapshot: &Snapshot<Formation>) -> Vec<&str> {
        snapshot.items().iter().map(|f| f.title.as_str()).collect()
    }

    async fn setup() -> (Arc<SqliteStore>, FormationsCache, AdminSession) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let session = store
            .create_session("admin@snw-academy.ma", chrono::Duration::hours(1))
            .await
            .unwrap();
        let cache = FormationsCache::new(store.clone());
        (store, cache, AdminSession::new(session))
    }

    #[test]
    fn test_snapshot_items() {
        let loading: Snapshot<u8> = Snapshot::Loading;
        assert!(loading.items().is_empty());
        assert!(!loading.is_ready());

        let failed: Snapshot<u8> = Snapshot::Failed("boom".to_string());
        assert!(failed.items().is_empty());

        let ready = Snapshot::Ready(Arc::new(vec![1, 2]));
        assert_eq!(ready.items(), &[1, 2]);
        assert!(ready.is_ready());
    }

    #[tokio::test]
    async fn test_single_store_subscription_for_many_attachments() {
        let (store, cache, _) = setup().await;

        let first = cache.attach();
        let second = cache.attach();
        let third = cache.attach();
        assert_eq!(cache.attached(), 3);
        assert_eq!(store.feed().subscriber_count(), 1);

        drop(first);
        drop(second);
        assert!(cache.relay_running());

        drop(third);
        assert_eq!(cache.attached(), 0);
        assert!(!cache.relay_running());
    }

    #[tokio::test]
    async fn test_store_subscription_released_after_last_detach() {
        let (store, cache, _) = setup().await;

        let attachment = cache.attach();
        drop(attachment);
        // Abort is processed at the task's next poll.
        for _ in 0..100 {
            if store.feed().subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(store.feed().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_publishes_to_watchers() {
        let (store, cache, session) = setup().await;
        let mut catalog = cache.watch_catalog();
        assert_eq!(*catalog.borrow(), Snapshot::Loading);

        store
            .insert(&session, FormationForm::new("Soins", "d").validate().unwrap())
            .await
            .unwrap();
        cache.refresh_catalog().await;

        assert!(catalog.has_changed().unwrap());
        assert_eq!(catalog.borrow_and_update().items().len(), 1);
    }

    #[tokio::test]
    async fn test_change_triggers_refetch_while_attached() {
        let (store, cache, session) = setup().await;
        let _attachment = cache.attach();
        let mut links = cache.watch_links();
        cache.refresh_links().await;
        links.borrow_and_update();

        store
            .insert(&session, FormationForm::new("Soins", "d").validate().unwrap())
            .await
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(2), links.changed())
            .await
            .expect("relay did not refresh")
            .unwrap();
        assert_eq!(links.borrow().items()[0].title, "Soins");
    }

    #[tokio::test]
    async fn test_unwatched_queries_are_not_refetched() {
        let (store, cache, session) = setup().await;
        let _attachment = cache.attach();
        let mut catalog = cache.watch_catalog();

        store
            .insert(&session, FormationForm::new("Soins", "d").validate().unwrap())
            .await
            .unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(2), catalog.changed())
            .await
            .expect("relay did not refresh")
            .unwrap();

        assert_eq!(cache.links(), Snapshot::Loading);
    }

    #[tokio::test]
    async fn test_overtaken_refresh_does_not_restore_deleted_row() {
        let (store, _, session) = setup().await;
        store
            .insert(&session, FormationForm::new("A", "d").validate().unwrap())
            .await
            .unwrap();
        let doomed = store
            .insert(&session, FormationForm::new("X", "d").validate().unwrap())
            .await
            .unwrap();

        let delayed = Arc::new(DelayedFirstRead::new(store.clone()));
        let cache = FormationsCache::new(delayed.clone());
        let mut catalog = cache.watch_catalog();

        let slow = tokio::spawn({
            let cache = cache.clone();
            async move { cache.refresh_catalog().await }
        });
        delayed.read.notified().await;

        store.delete(&session, &doomed.id).await.unwrap();
        let fast = cache.refresh_catalog().await;
        assert_eq!(titles(&fast), ["A"]);
        catalog.borrow_and_update();

        delayed.release.notify_one();
        let returned = slow.await.unwrap();

        assert_eq!(titles(&returned), ["A"]);
        assert_eq!(titles(&cache.catalog()), ["A"]);
        assert!(!catalog.has_changed().unwrap());
    }
}
