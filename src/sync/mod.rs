//! Live synchronization of a remote collection.
//!
//! A [`SyncManager`] owns one standing subscription and republishes every
//! pushed snapshot as a validated, read-only [`SyncState`]:
//! - `Connecting` until the first snapshot or error
//! - `Synchronized` on every push (snapshots replace, never merge)
//! - `Failed` when the initial connection fails
//! - `Terminated` once released; late pushes are discarded
//!
//! Consumers either poll [`SyncManager::state`] or block on a [`Watcher`].

mod manager;
mod state;

pub use manager::SyncManager;
pub use state::{ErrorInfo, ErrorKind, Phase, SyncNotification, SyncState, Watcher};
