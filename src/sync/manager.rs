//! Live subscription manager.

use super::state::{ErrorInfo, Phase, SyncNotification, SyncState, Watcher};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::event::materialize;
use crate::query::FeedQuery;
use crate::store::{CollectionClient, ErrorCallback, ListenerHandle, PushCallback, RemoteStore};
use crate::types::RawRecord;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// State guarded together with the generation that owns it.
struct Inner {
    /// Bumped on every subscribe and teardown. A callback carrying an older
    /// value belongs to a dead subscription.
    generation: u64,
    state: SyncState,
}

/// Shared between the manager and the callbacks it hands to the store.
struct Shared {
    inner: RwLock<Inner>,
    watchers: Mutex<Vec<Sender<SyncNotification>>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                generation: 0,
                state: SyncState::idle(),
            }),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Start a new generation with a fresh state. Returns its token.
    fn begin(&self, path: &str) -> u64 {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.state = SyncState::connecting(path);
        self.notify(&inner);
        inner.generation
    }

    /// Invalidate the current generation. Returns false if there was nothing
    /// to terminate.
    fn terminate(&self) -> bool {
        let mut inner = self.inner.write();
        if matches!(inner.state.phase, Phase::Idle | Phase::Terminated) {
            return false;
        }
        inner.generation += 1;
        inner.state = SyncState::terminated();
        self.notify(&inner);
        true
    }

    /// Mutate state only if `token` is still the live generation.
    ///
    /// The check and the mutation happen under one write lock, so a teardown
    /// can never interleave between them.
    fn apply<F>(&self, token: u64, mutate: F) -> bool
    where
        F: FnOnce(&mut SyncState) -> bool,
    {
        let mut inner = self.inner.write();
        if inner.generation != token {
            return false;
        }
        let changed = mutate(&mut inner.state);
        if changed {
            self.notify(&inner);
        }
        changed
    }

    fn push(&self, token: u64, records: Vec<RawRecord>) {
        let materialized = materialize(&records);
        let rejected = materialized.rejected.len();
        let events = Arc::new(materialized.events);

        let applied = self.apply(token, |state| {
            if !matches!(state.phase, Phase::Connecting | Phase::Synchronized) {
                return false;
            }
            state.phase = Phase::Synchronized;
            state.snapshot = Some(events);
            state.is_loading = false;
            state.error = None;
            state.rejected = rejected;
            state.pushes += 1;
            true
        });

        if applied {
            if rejected > 0 {
                warn!(generation = token, rejected, "push contained malformed records");
            }
        } else {
            trace!(generation = token, "discarding push for inactive subscription");
        }
    }

    fn fail(&self, token: u64, err: &SyncError) {
        let info = ErrorInfo::from(err);
        let applied = self.apply(token, |state| match state.phase {
            Phase::Connecting => {
                state.phase = Phase::Failed;
                state.is_loading = false;
                state.snapshot = None;
                state.error = Some(info);
                true
            }
            // Keep the last good snapshot; the consumer sees it as stale.
            Phase::Synchronized => {
                state.error = Some(info);
                true
            }
            _ => false,
        });

        if applied {
            warn!(generation = token, error = %err, "subscription error");
        } else {
            trace!(generation = token, "discarding error for inactive subscription");
        }
    }

    /// Fan the current state out to watchers, dropping any that are full or gone.
    fn notify(&self, inner: &Inner) {
        let mut watchers = self.watchers.lock();
        if watchers.is_empty() {
            return;
        }
        let notification = SyncNotification {
            generation: inner.generation,
            state: inner.state.clone(),
        };
        watchers.retain(|tx| match tx.try_send(notification.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("dropping slow watcher");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

/// The subscription currently owned by a manager.
struct ActiveSubscription {
    path: String,
    token: u64,
    handle: Box<dyn ListenerHandle>,
}

/// Keeps a local, validated view of one remote collection up to date.
///
/// A manager owns at most one live subscription. Subscribing to a new path
/// tears the previous one down first, and any push that arrives for a torn
/// down subscription is discarded.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let manager = SyncManager::new(store);
///
/// manager.subscribe("events");
/// let state = manager.state();
/// if state.is_loading {
///     // show spinner
/// }
/// manager.unsubscribe();
/// ```
pub struct SyncManager<S: RemoteStore + ?Sized> {
    client: CollectionClient<S>,
    shared: Arc<Shared>,
    active: Mutex<Option<ActiveSubscription>>,
    /// Path to re-subscribe to on `retry`. Cleared by `unsubscribe`.
    last_path: Mutex<Option<String>>,
    config: SyncConfig,
}

impl<S: RemoteStore + ?Sized> SyncManager<S> {
    /// Create a manager with default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, SyncConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            client: CollectionClient::new(store),
            shared: Arc::new(Shared::new()),
            active: Mutex::new(None),
            last_path: Mutex::new(None),
            config,
        }
    }

    // --- Lifecycle ---

    /// Start synchronizing `path`, replacing any current subscription.
    ///
    /// Never fails: a store that cannot be reached leaves the state in
    /// [`Phase::Failed`] with the error recorded.
    pub fn subscribe(&self, path: &str) {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            self.teardown(previous);
        }

        let token = self.shared.begin(path);
        *self.last_path.lock() = Some(path.to_string());
        debug!(path, generation = token, "subscribing");

        let on_push: PushCallback = {
            let shared = Arc::downgrade(&self.shared);
            Arc::new(move |records: Vec<RawRecord>| {
                if let Some(shared) = Weak::upgrade(&shared) {
                    shared.push(token, records);
                }
            })
        };
        let on_error: ErrorCallback = {
            let shared = Arc::downgrade(&self.shared);
            Arc::new(move |err: SyncError| {
                if let Some(shared) = Weak::upgrade(&shared) {
                    shared.fail(token, &err);
                }
            })
        };

        match self.client.store().open_subscription(path, on_push, on_error) {
            Ok(handle) => {
                *active = Some(ActiveSubscription {
                    path: path.to_string(),
                    token,
                    handle,
                });
            }
            Err(err) => self.shared.fail(token, &err),
        }
    }

    /// Stop synchronizing and release the snapshot. Safe to call repeatedly.
    pub fn unsubscribe(&self) {
        let mut active = self.active.lock();
        *self.last_path.lock() = None;
        match active.take() {
            Some(subscription) => self.teardown(subscription),
            // A failed subscribe leaves no handle but still has state to release.
            None => {
                if self.shared.terminate() {
                    debug!("released subscription without a store handle");
                }
            }
        }
    }

    /// Alias of [`subscribe`](Self::subscribe) for callers that think in
    /// mount/unmount terms.
    pub fn open(&self, path: &str) {
        self.subscribe(path);
    }

    /// Alias of [`unsubscribe`](Self::unsubscribe).
    pub fn close(&self) {
        self.unsubscribe();
    }

    /// Subscribe again to the most recent path, e.g. after a failure.
    ///
    /// Returns [`SyncError::SubscriptionTerminated`] if the manager was never
    /// subscribed or has been released.
    pub fn retry(&self) -> Result<()> {
        let path = self
            .last_path
            .lock()
            .clone()
            .ok_or(SyncError::SubscriptionTerminated)?;
        self.subscribe(&path);
        Ok(())
    }

    fn teardown(&self, mut subscription: ActiveSubscription) {
        // Invalidate first so nothing in flight lands after this point.
        self.shared.terminate();
        match subscription.handle.cancel() {
            Ok(()) => debug!(
                path = %subscription.path,
                generation = subscription.token,
                "unsubscribed"
            ),
            Err(err) => debug!(path = %subscription.path, error = %err, "store handle already cancelled"),
        }
    }

    // --- Observation ---

    /// Current state.
    pub fn state(&self) -> SyncState {
        self.shared.inner.read().state.clone()
    }

    /// Receive a notification on every state change.
    ///
    /// The watcher is dropped if it falls `notify_buffer` notifications behind.
    pub fn watch(&self) -> Watcher {
        let (tx, rx) = bounded(self.config.notify_buffer.max(1));
        self.shared.watchers.lock().push(tx);
        Watcher { receiver: rx }
    }

    /// Path of the live subscription, if any.
    pub fn path(&self) -> Option<String> {
        self.active.lock().as_ref().map(|s| s.path.clone())
    }

    /// One-shot reader over the same store.
    pub fn client(&self) -> &CollectionClient<S> {
        &self.client
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// A feed query using the configured page size.
    pub fn feed_query(&self) -> FeedQuery {
        FeedQuery::new(self.config.page_size)
    }

    /// Get watcher count.
    pub fn watcher_count(&self) -> usize {
        self.shared.watchers.lock().len()
    }
}

impl<S: RemoteStore + ?Sized> Drop for SyncManager<S> {
    fn drop(&mut self) {
        if let Some(subscription) = self.active.get_mut().take() {
            self.teardown(subscription);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::sync::ErrorKind;
    use serde_json::json;
    use std::time::Duration;

    fn event(id: &str, severity: &str) -> serde_json::Value {
        json!({
            "id": id,
            "timestamp": 1_700_000_000_000i64,
            "category": "alert",
            "severity": severity,
            "title": "Low soil moisture",
            "description": "Soil humidity below threshold",
        })
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let store = Arc::new(MemoryStore::new());
        let manager = SyncManager::new(Arc::clone(&store));
        assert_eq!(manager.state().phase, Phase::Idle);

        manager.subscribe("events");
        assert_eq!(store.listener_count(), 1);
        assert_eq!(manager.path().as_deref(), Some("events"));

        // MemoryStore pushes the (empty) collection on attach.
        let state = manager.state();
        assert_eq!(state.phase, Phase::Synchronized);
        assert!(!state.is_loading);
        assert_eq!(state.events().len(), 0);

        manager.unsubscribe();
        assert_eq!(store.listener_count(), 0);
        assert_eq!(manager.state().phase, Phase::Terminated);
        assert!(manager.path().is_none());
    }

    #[test]
    fn test_push_replaces_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let manager = SyncManager::new(Arc::clone(&store));
        manager.subscribe("events");

        store.put("events", "1", event("1", "warning")).unwrap();
        store.put("events", "2", event("2", "info")).unwrap();

        let state = manager.state();
        let ids: Vec<_> = state.events().iter().map(|e| e.id.0.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(state.pushes, 3);

        store.remove("events", "1").unwrap();
        let ids: Vec<_> = manager
            .state()
            .events()
            .iter()
            .map(|e| e.id.0.clone())
            .collect();
        assert_eq!(ids, vec!["2".to_string()]);
    }

    #[test]
    fn test_malformed_record_does_not_blank_view() {
        let store = Arc::new(MemoryStore::new());
        let manager = SyncManager::new(Arc::clone(&store));
        manager.subscribe("events");

        store.put("events", "1", event("1", "warning")).unwrap();
        store.put("events", "2", event("2", "catastrophic")).unwrap();

        let state = manager.state();
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.rejected, 1);
        assert!(!state.is_error());
    }

    #[test]
    fn test_offline_subscribe_fails() {
        let store = Arc::new(MemoryStore::new());
        store.set_online(false);
        let manager = SyncManager::new(Arc::clone(&store));

        manager.subscribe("events");
        let state = manager.state();
        assert_eq!(state.phase, Phase::Failed);
        assert!(!state.is_loading);
        assert!(state.snapshot.is_none());
        assert_eq!(
            state.error.as_ref().map(|e| e.kind),
            Some(ErrorKind::Connection)
        );

        store.set_online(true);
        manager.retry().unwrap();
        assert_eq!(manager.state().phase, Phase::Synchronized);
    }

    #[test]
    fn test_retry_after_close() {
        let manager = SyncManager::new(Arc::new(MemoryStore::new()));
        assert!(matches!(manager.retry(), Err(SyncError::SubscriptionTerminated)));

        manager.subscribe("events");
        manager.close();
        assert!(matches!(manager.retry(), Err(SyncError::SubscriptionTerminated)));
    }

    #[test]
    fn test_unsubscribe_after_failed_subscribe() {
        let store = Arc::new(MemoryStore::new());
        store.set_online(false);
        let manager = SyncManager::new(store);

        manager.subscribe("events");
        manager.unsubscribe();
        assert_eq!(manager.state().phase, Phase::Terminated);
        assert!(manager.state().error.is_none());
    }

    #[test]
    fn test_dropped_connection_keeps_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let manager = SyncManager::new(Arc::clone(&store));
        manager.subscribe("events");
        store.put("events", "1", event("1", "error")).unwrap();

        store.drop_listeners("events", "socket closed");
        let state = manager.state();
        assert_eq!(state.phase, Phase::Synchronized);
        assert!(state.is_stale());
        assert_eq!(state.events().len(), 1);

        // Consumer-driven recovery.
        manager.retry().unwrap();
        let state = manager.state();
        assert!(!state.is_error());
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn test_watch_notifies() {
        let store = Arc::new(MemoryStore::new());
        let manager = SyncManager::new(Arc::clone(&store));
        let watcher = manager.watch();

        manager.subscribe("events");
        let connecting = watcher.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(connecting.state.phase, Phase::Connecting);
        assert!(connecting.state.is_loading);

        let synced = watcher.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(synced.state.phase, Phase::Synchronized);
        assert_eq!(synced.generation, connecting.generation);

        store.put("events", "1", event("1", "info")).unwrap();
        let latest = watcher.latest().unwrap();
        assert_eq!(latest.state.events().len(), 1);
    }

    #[test]
    fn test_drop_slow_watcher() {
        let store = Arc::new(MemoryStore::new());
        let config = SyncConfig {
            notify_buffer: 2,
            ..Default::default()
        };
        let manager = SyncManager::with_config(Arc::clone(&store), config);
        let _watcher = manager.watch();
        manager.subscribe("events");

        for i in 0..10 {
            store.put("events", &i.to_string(), event(&i.to_string(), "info")).unwrap();
        }

        assert_eq!(manager.watcher_count(), 0);
        // The manager itself keeps syncing.
        assert_eq!(manager.state().events().len(), 10);
    }

    #[test]
    fn test_dropped_watcher_is_forgotten() {
        let store = Arc::new(MemoryStore::new());
        let manager = SyncManager::new(Arc::clone(&store));
        let kept = manager.watch();
        let dropped = manager.watch();
        assert_eq!(manager.watcher_count(), 2);

        drop(dropped);
        manager.subscribe("events");
        store.put("events", "1", event("1", "info")).unwrap();

        assert_eq!(manager.watcher_count(), 1);
        assert_eq!(kept.latest().unwrap().state.events().len(), 1);
    }

    #[test]
    fn test_drop_manager_releases_listener() {
        let store = Arc::new(MemoryStore::new());
        {
            let manager = SyncManager::new(Arc::clone(&store));
            manager.subscribe("events");
            assert_eq!(store.listener_count(), 1);
        }
        assert_eq!(store.listener_count(), 0);
    }
}
