//! Shared helpers for integration tests.

#![allow(dead_code)]

use agriflow_sync::{
    ErrorCallback, ListenerHandle, PushCallback, RawRecord, RemoteStore, Result, SyncError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// One subscription opened against a [`ScriptedStore`].
pub struct OpenedSubscription {
    pub path: String,
    pub on_push: PushCallback,
    pub on_error: ErrorCallback,
    pub cancelled: Arc<AtomicBool>,
}

/// A store that never pushes on its own.
///
/// Tests hold on to every callback it was given and deliver pushes and errors
/// by hand, including after the subscription was cancelled.
#[derive(Default)]
pub struct ScriptedStore {
    opened: Mutex<Vec<OpenedSubscription>>,
    collections: Mutex<HashMap<String, Vec<RawRecord>>>,
    next_open_error: Mutex<Option<SyncError>>,
    fetch_error: Mutex<Option<String>>,
    /// Make every cancel report an already-terminated handle.
    pub cancel_always_fails: AtomicBool,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_collection(&self, path: &str, records: Vec<RawRecord>) {
        self.collections.lock().insert(path.to_string(), records);
    }

    pub fn fail_next_open(&self, err: SyncError) {
        *self.next_open_error.lock() = Some(err);
    }

    pub fn fail_fetches(&self, message: &str) {
        *self.fetch_error.lock() = Some(message.to_string());
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }

    pub fn path_of(&self, index: usize) -> String {
        self.opened.lock()[index].path.clone()
    }

    pub fn is_cancelled(&self, index: usize) -> bool {
        self.opened.lock()[index].cancelled.load(Ordering::SeqCst)
    }

    pub fn live_count(&self) -> usize {
        self.opened
            .lock()
            .iter()
            .filter(|s| !s.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Deliver a push through the callback of subscription `index`, whether
    /// or not it has been cancelled.
    pub fn push(&self, index: usize, records: Vec<RawRecord>) {
        let on_push = Arc::clone(&self.opened.lock()[index].on_push);
        on_push(records);
    }

    pub fn error(&self, index: usize, err: SyncError) {
        let on_error = Arc::clone(&self.opened.lock()[index].on_error);
        on_error(err);
    }
}

impl RemoteStore for ScriptedStore {
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawRecord>> {
        if let Some(message) = self.fetch_error.lock().clone() {
            return Err(SyncError::Connection(message));
        }
        Ok(self.collections.lock().get(path).cloned().unwrap_or_default())
    }

    fn open_subscription(
        &self,
        path: &str,
        on_push: PushCallback,
        on_error: ErrorCallback,
    ) -> Result<Box<dyn ListenerHandle>> {
        if let Some(err) = self.next_open_error.lock().take() {
            return Err(err);
        }
        let cancelled = Arc::new(AtomicBool::new(false));
        self.opened.lock().push(OpenedSubscription {
            path: path.to_string(),
            on_push,
            on_error,
            cancelled: Arc::clone(&cancelled),
        });
        Ok(Box::new(ScriptedHandle {
            cancelled,
            always_fail: self.cancel_always_fails.load(Ordering::SeqCst),
        }))
    }
}

struct ScriptedHandle {
    cancelled: Arc<AtomicBool>,
    always_fail: bool,
}

impl ListenerHandle for ScriptedHandle {
    fn cancel(&mut self) -> Result<()> {
        if self.always_fail || self.cancelled.swap(true, Ordering::SeqCst) {
            return Err(SyncError::SubscriptionTerminated);
        }
        Ok(())
    }
}

/// A valid raw event document.
pub fn raw_event(id: &str, category: &str, severity: &str, title: &str, ts_millis: i64) -> RawRecord {
    RawRecord::new(json!({
        "id": id,
        "timestamp": ts_millis,
        "category": category,
        "severity": severity,
        "title": title,
        "description": format!("{} (details)", title),
    }))
}

pub fn with_fields(mut record: RawRecord, extra: Value) -> RawRecord {
    if let (Some(body), Some(extra)) = (record.fields.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            body.insert(k.clone(), v.clone());
        }
    }
    record
}

pub fn ids(events: &[agriflow_sync::Event]) -> Vec<String> {
    events.iter().map(|e| e.id.0.clone()).collect()
}
