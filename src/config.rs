//! Sync layer configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Configuration for a [`SyncManager`](crate::SyncManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Max buffered notifications per watcher before it is dropped.
    /// Default: 64
    pub notify_buffer: usize,

    /// Default page size for feed pagination.
    /// Default: 10
    pub page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            notify_buffer: 64,
            page_size: 10,
        }
    }
}

impl SyncConfig {
    /// Load from JSON; missing keys keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
