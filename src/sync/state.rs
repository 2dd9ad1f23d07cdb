//! Consumer-visible subscription state.

use crate::error::SyncError;
use crate::event::Event;
use std::sync::Arc;

/// Where a subscription is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Nothing requested yet.
    Idle,
    /// Subscription requested, waiting for the first snapshot.
    Connecting,
    /// At least one snapshot received.
    Synchronized,
    /// The initial connection failed. Terminal until the consumer retries.
    Failed,
    /// Released by the consumer.
    Terminated,
}

/// Coarse class of a surfaced error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    InvalidPath,
    Other,
}

/// An error as shown to the consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SyncError> for ErrorInfo {
    fn from(err: &SyncError) -> Self {
        let kind = match err {
            SyncError::Connection(_) => ErrorKind::Connection,
            SyncError::InvalidPath(_) => ErrorKind::InvalidPath,
            _ => ErrorKind::Other,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Read-only view of one subscription.
///
/// Cloning is cheap: the snapshot is shared.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncState {
    pub phase: Phase,
    /// Collection the subscription targets.
    pub path: Option<String>,
    /// Latest pushed view, in store order. `None` until the first push.
    pub snapshot: Option<Arc<Vec<Event>>>,
    pub is_loading: bool,
    pub error: Option<ErrorInfo>,
    /// Records dropped from the latest push because they failed validation.
    pub rejected: usize,
    /// Pushes applied since the subscription started.
    pub pushes: u64,
}

impl SyncState {
    pub(crate) fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            path: None,
            snapshot: None,
            is_loading: false,
            error: None,
            rejected: 0,
            pushes: 0,
        }
    }

    pub(crate) fn connecting(path: &str) -> Self {
        Self {
            phase: Phase::Connecting,
            path: Some(path.to_string()),
            is_loading: true,
            ..Self::idle()
        }
    }

    pub(crate) fn terminated() -> Self {
        Self {
            phase: Phase::Terminated,
            ..Self::idle()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// A snapshot is shown but the stream behind it has failed.
    pub fn is_stale(&self) -> bool {
        self.snapshot.is_some() && self.error.is_some()
    }

    /// Events of the current snapshot, empty before the first push.
    pub fn events(&self) -> &[Event] {
        self.snapshot.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Sent to watchers on every state change.
#[derive(Clone, Debug)]
pub struct SyncNotification {
    /// Subscription instance the change belongs to.
    pub generation: u64,
    pub state: SyncState,
}

/// Receiving side of [`SyncManager::watch`](crate::SyncManager::watch).
pub struct Watcher {
    pub(crate) receiver: crossbeam_channel::Receiver<SyncNotification>,
}

impl Watcher {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> Result<SyncNotification, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> Result<SyncNotification, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<SyncNotification, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything pending and keep only the newest.
    pub fn latest(&self) -> Option<SyncNotification> {
        self.receiver.try_iter().last()
    }
}
