//! # Agriflow Sync
//!
//! Real-time event synchronization for the Agriflow IoT agriculture dashboard.
//!
//! ## Core Concepts
//!
//! - **Events**: Sensor readings, alerts, harvest/planting milestones and
//!   maintenance actions, validated from raw store documents
//! - **Remote store**: Any document store that can read a collection once and
//!   push complete snapshots of it on change
//! - **Sync manager**: Owns one live subscription and exposes a read-only
//!   `(snapshot, is_loading, error)` view of it
//! - **Queries**: Filtering, sorting, paging and export over a snapshot
//!
//! ## Example
//!
//! ```ignore
//! use agriflow_sync::{MemoryStore, SyncManager, EventFilter, Severity};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let manager = SyncManager::new(Arc::clone(&store));
//!
//! manager.subscribe("events");
//! let watcher = manager.watch();
//!
//! store.put("events", "1", json!({
//!     "timestamp": 1_700_000_000_000i64,
//!     "category": "alert",
//!     "severity": "warning",
//!     "title": "Low soil moisture",
//!     "description": "North Field below 30%",
//! }))?;
//!
//! let state = watcher.recv()?.state;
//! let warnings = EventFilter::new()
//!     .severities(vec![Severity::Warning])
//!     .apply(state.events());
//!
//! manager.unsubscribe();
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod query;
pub mod store;
pub mod sync;
pub mod types;

// Re-exports
pub use config::SyncConfig;
pub use error::{MalformedEventError, MalformedReason, Result, SyncError};
pub use event::{
    materialize, Category, Event, Materialized, Measurement, RejectedRecord, Resolution, Severity,
};
pub use query::{
    export_csv, export_file_name, paginate, sort_events, timeline, DateRange, EventFilter,
    EventStats, Facets, FeedQuery, Page, SortDirection, SortField, SortOrder, TimelineDay,
};
pub use store::{
    CollectionClient, ErrorCallback, ListenerHandle, MemoryStore, PushCallback, RemoteStore,
};
pub use sync::{ErrorInfo, ErrorKind, Phase, SyncManager, SyncNotification, SyncState, Watcher};
pub use types::*;
