//! The remote document store collaborator.
//!
//! The sync layer needs exactly two things from a store:
//! - a one-shot read of a collection ([`RemoteStore::fetch_collection`])
//! - a standing subscription that pushes complete snapshots
//!   ([`RemoteStore::open_subscription`])
//!
//! Stores are passed in explicitly, so tests can substitute a fake without
//! touching any process-wide connection.

mod client;
mod memory;

pub use client::CollectionClient;
pub use memory::MemoryStore;

use crate::error::{Result, SyncError};
use crate::types::RawRecord;
use std::sync::Arc;

/// Invoked with the full materialized contents of the collection on every change.
pub type PushCallback = Arc<dyn Fn(Vec<RawRecord>) + Send + Sync>;

/// Invoked when the store loses or fails to establish the stream.
pub type ErrorCallback = Arc<dyn Fn(SyncError) + Send + Sync>;

/// Cancellation side of an open subscription.
pub trait ListenerHandle: Send {
    /// Stop delivery. A second call returns [`SyncError::SubscriptionTerminated`].
    fn cancel(&mut self) -> Result<()>;
}

/// A remote document store.
pub trait RemoteStore: Send + Sync {
    /// Read the current contents of a collection, in store order.
    ///
    /// Transport and auth failures surface as [`SyncError::Connection`];
    /// no retry happens here.
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawRecord>>;

    /// Open a standing subscription to a collection.
    ///
    /// The store may invoke `on_push` before this call returns (for the
    /// initial snapshot) and on any thread afterwards.
    fn open_subscription(
        &self,
        path: &str,
        on_push: PushCallback,
        on_error: ErrorCallback,
    ) -> Result<Box<dyn ListenerHandle>>;
}
