//! One-shot collection reads.

use super::RemoteStore;
use crate::error::Result;
use crate::event::{materialize, Materialized};
use crate::types::RawRecord;
use std::sync::Arc;
use tracing::debug;

/// Point-in-time reader for named collections.
///
/// Holds no mutable state, so one client can serve concurrent reads of
/// different paths.
pub struct CollectionClient<S: RemoteStore + ?Sized> {
    store: Arc<S>,
}

impl<S: RemoteStore + ?Sized> Clone for CollectionClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RemoteStore + ?Sized> CollectionClient<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetch raw records in store order. Errors are returned unchanged.
    pub fn fetch_collection(&self, path: &str) -> Result<Vec<RawRecord>> {
        let records = self.store.fetch_collection(path)?;
        debug!(path, count = records.len(), "fetched collection");
        Ok(records)
    }

    /// Fetch and validate. Malformed records are dropped, not fatal.
    pub fn fetch_events(&self, path: &str) -> Result<Materialized> {
        let records = self.fetch_collection(path)?;
        Ok(materialize(&records))
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
