//! In-process document store.
//!
//! Keeps collections of keyed JSON documents and pushes the full collection
//! to every listener of a path after each write. Useful for tests, demos and
//! for running the dashboard against local fixtures.

use super::{ErrorCallback, ListenerHandle, PushCallback, RemoteStore};
use crate::error::{Result, SyncError};
use crate::types::{ListenerId, RawRecord};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Internal listener state.
struct Listener {
    path: String,
    on_push: PushCallback,
    on_error: ErrorCallback,
}

type ListenerMap = RwLock<HashMap<ListenerId, Listener>>;

/// An in-memory [`RemoteStore`].
pub struct MemoryStore {
    /// Documents per collection path, in insertion order.
    collections: RwLock<HashMap<String, Vec<(String, serde_json::Value)>>>,
    /// Active listeners by ID.
    listeners: Arc<ListenerMap>,
    /// Held from a write through its pushes, so listeners see writes in
    /// the order they were applied.
    delivery: Mutex<()>,
    /// Counter for generating listener IDs.
    next_id: AtomicU64,
    /// When false, reads and new subscriptions fail with a connection error.
    online: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            listeners: Arc::new(RwLock::new(HashMap::new())),
            delivery: Mutex::new(()),
            next_id: AtomicU64::new(1),
            online: AtomicBool::new(true),
        }
    }

    /// Simulate the transport going away (or coming back).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Insert or replace a document, then push the collection to its listeners.
    ///
    /// Replacing keeps the document's original position.
    pub fn put(&self, path: &str, key: &str, fields: serde_json::Value) -> Result<()> {
        validate_path(path)?;
        let _delivery = self.delivery.lock();
        {
            let mut collections = self.collections.write();
            let docs = collections.entry(path.to_string()).or_default();
            match docs.iter_mut().find(|(k, _)| k == key) {
                Some(doc) => doc.1 = fields,
                None => docs.push((key.to_string(), fields)),
            }
        }
        self.notify(path);
        Ok(())
    }

    /// Delete a document. Returns whether it existed.
    pub fn remove(&self, path: &str, key: &str) -> Result<bool> {
        validate_path(path)?;
        let _delivery = self.delivery.lock();
        let removed = {
            let mut collections = self.collections.write();
            match collections.get_mut(path) {
                Some(docs) => {
                    let before = docs.len();
                    docs.retain(|(k, _)| k != key);
                    docs.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.notify(path);
        }
        Ok(removed)
    }

    /// Replace a whole collection in one write (one push).
    pub fn replace_collection(
        &self,
        path: &str,
        docs: Vec<(String, serde_json::Value)>,
    ) -> Result<()> {
        validate_path(path)?;
        let _delivery = self.delivery.lock();
        self.collections.write().insert(path.to_string(), docs);
        self.notify(path);
        Ok(())
    }

    /// Fail every listener on `path` with a connection error and forget them.
    ///
    /// Returns how many listeners were dropped.
    pub fn drop_listeners(&self, path: &str, reason: &str) -> usize {
        let _delivery = self.delivery.lock();
        let dropped: Vec<ErrorCallback> = {
            let mut listeners = self.listeners.write();
            let ids: Vec<ListenerId> = listeners
                .iter()
                .filter(|(_, l)| l.path == path)
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| listeners.remove(id))
                .map(|l| l.on_error)
                .collect()
        };

        for on_error in &dropped {
            on_error(SyncError::Connection(reason.to_string()));
        }
        dropped.len()
    }

    /// Get listener count.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn snapshot(&self, path: &str) -> Vec<RawRecord> {
        self.collections
            .read()
            .get(path)
            .map(|docs| {
                docs.iter()
                    .map(|(key, fields)| RawRecord::with_key(key.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Push the current collection to every listener of `path`.
    ///
    /// Called with `delivery` held. Callbacks run after the listener lock is
    /// released, so they may read from the store or cancel their handle, but
    /// must not write to it.
    fn notify(&self, path: &str) {
        let targets: Vec<PushCallback> = {
            let listeners = self.listeners.read();
            listeners
                .values()
                .filter(|l| l.path == path)
                .map(|l| Arc::clone(&l.on_push))
                .collect()
        };
        if targets.is_empty() {
            return;
        }

        let records = self.snapshot(path);
        debug!(path, listeners = targets.len(), docs = records.len(), "pushing snapshot");
        for on_push in targets {
            on_push(records.clone());
        }
    }

    fn ensure_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(SyncError::Connection("store unreachable".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryStore {
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawRecord>> {
        self.ensure_online()?;
        validate_path(path)?;
        Ok(self.snapshot(path))
    }

    fn open_subscription(
        &self,
        path: &str,
        on_push: PushCallback,
        on_error: ErrorCallback,
    ) -> Result<Box<dyn ListenerHandle>> {
        self.ensure_online()?;
        validate_path(path)?;
        let _delivery = self.delivery.lock();

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(
            id,
            Listener {
                path: path.to_string(),
                on_push: Arc::clone(&on_push),
                on_error,
            },
        );

        // Initial snapshot, like a real document store sends on attach.
        on_push(self.snapshot(path));

        Ok(Box::new(MemoryListenerHandle {
            id,
            listeners: Arc::downgrade(&self.listeners),
            cancelled: false,
        }))
    }
}

fn validate_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(SyncError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Handle returned by [`MemoryStore::open_subscription`].
struct MemoryListenerHandle {
    id: ListenerId,
    listeners: Weak<ListenerMap>,
    cancelled: bool,
}

impl MemoryListenerHandle {
    fn detach(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.write().remove(&self.id);
        }
    }
}

impl ListenerHandle for MemoryListenerHandle {
    fn cancel(&mut self) -> Result<()> {
        if self.cancelled {
            return Err(SyncError::SubscriptionTerminated);
        }
        self.cancelled = true;
        self.detach();
        Ok(())
    }
}

impl Drop for MemoryListenerHandle {
    fn drop(&mut self) {
        if !self.cancelled {
            self.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn recorder() -> (PushCallback, Arc<Mutex<Vec<Vec<RawRecord>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: PushCallback = Arc::new(move |records: Vec<RawRecord>| sink.lock().push(records));
        (cb, seen)
    }

    fn ignore_errors() -> ErrorCallback {
        Arc::new(|_: SyncError| {})
    }

    #[test]
    fn test_subscribe_receives_initial_and_updates() {
        let store = MemoryStore::new();
        store.put("events", "1", json!({"id": "1"})).unwrap();

        let (on_push, seen) = recorder();
        let _handle = store
            .open_subscription("events", on_push, ignore_errors())
            .unwrap();
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].len(), 1);

        store.put("events", "2", json!({"id": "2"})).unwrap();
        store.put("other", "x", json!({})).unwrap();

        let pushes = seen.lock();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1].len(), 2);
        assert_eq!(pushes[1][1].key.as_deref(), Some("2"));
    }

    #[test]
    fn test_concurrent_writes_push_in_write_order() {
        let store = Arc::new(MemoryStore::new());
        let (on_push, seen) = recorder();
        let _handle = store
            .open_subscription("events", on_push, ignore_errors())
            .unwrap();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("{}-{}", w, i);
                        store.put("events", &key, json!({"w": w})).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let pushes = seen.lock();
        // Initial snapshot plus one push per write, each one document larger.
        assert_eq!(pushes.len(), 201);
        for (n, push) in pushes.iter().enumerate() {
            assert_eq!(push.len(), n);
        }
    }

    #[test]
    fn test_put_replaces_in_place() {
        let store = MemoryStore::new();
        store.put("events", "a", json!({"v": 1})).unwrap();
        store.put("events", "b", json!({"v": 2})).unwrap();
        store.put("events", "a", json!({"v": 3})).unwrap();

        let records = store.fetch_collection("events").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key.as_deref(), Some("a"));
        assert_eq!(records[0].fields["v"], 3);
    }

    #[test]
    fn test_cancel_twice() {
        let store = MemoryStore::new();
        let (on_push, _) = recorder();
        let mut handle = store
            .open_subscription("events", on_push, ignore_errors())
            .unwrap();
        assert_eq!(store.listener_count(), 1);

        handle.cancel().unwrap();
        assert_eq!(store.listener_count(), 0);
        assert!(matches!(handle.cancel(), Err(SyncError::SubscriptionTerminated)));
    }

    #[test]
    fn test_dropping_handle_detaches() {
        let store = MemoryStore::new();
        let (on_push, _) = recorder();
        let handle = store
            .open_subscription("events", on_push, ignore_errors())
            .unwrap();
        drop(handle);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_offline_and_invalid_path() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.fetch_collection("  "),
            Err(SyncError::InvalidPath(_))
        ));

        store.set_online(false);
        assert!(matches!(
            store.fetch_collection("events"),
            Err(SyncError::Connection(_))
        ));
        let (on_push, _) = recorder();
        assert!(store
            .open_subscription("events", on_push, ignore_errors())
            .is_err());
    }

    #[test]
    fn test_drop_listeners_reports_error() {
        let store = MemoryStore::new();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let on_error: ErrorCallback = Arc::new(move |e: SyncError| sink.lock().push(e.to_string()));
        let (on_push, _) = recorder();
        let _handle = store.open_subscription("events", on_push, on_error).unwrap();

        assert_eq!(store.drop_listeners("events", "socket closed"), 1);
        assert_eq!(store.listener_count(), 0);
        assert_eq!(
            errors.lock().clone(),
            vec!["Connection error: socket closed".to_string()]
        );
    }
}
