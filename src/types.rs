//! Core types shared across the sync layer.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque event identifier, stable across updates to the same logical event.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId(s.to_string())
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// From milliseconds since epoch (the JavaScript `Date` unit).
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis.saturating_mul(1_000))
    }

    /// From a store-native `{seconds, nanoseconds}` pair.
    pub fn from_parts(seconds: i64, nanos: i64) -> Self {
        Timestamp(seconds.saturating_mul(1_000_000).saturating_add(nanos / 1_000))
    }

    /// Parse an RFC 3339 string such as `2025-03-01T08:30:00Z`.
    pub fn parse_rfc3339(s: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Timestamp(dt.timestamp_micros()))
    }

    pub fn as_millis(&self) -> i64 {
        self.0 / 1_000
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = self.0.div_euclid(1_000_000);
        let nanos = (self.0.rem_euclid(1_000_000) * 1_000) as u32;
        Utc.timestamp_opt(secs, nanos).single()
    }

    /// Calendar day (UTC) this instant falls on.
    pub fn day(&self) -> Option<NaiveDate> {
        self.to_datetime().map(|dt| dt.date_naive())
    }

    /// RFC 3339 in UTC, with as many fractional digits as needed.
    pub fn to_rfc3339(&self) -> String {
        match self.to_datetime() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => self.0.to_string(),
        }
    }

    /// `yyyy-MM-dd HH:mm:ss` in UTC, as shown in exports.
    pub fn format_display(&self) -> String {
        match self.to_datetime() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A loosely-typed document as delivered by the remote store.
///
/// This is the only untyped value in the crate; it is validated once by
/// [`Event::from_raw`](crate::Event::from_raw) and never travels further.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Document key in the collection, if the store has one.
    pub key: Option<String>,
    /// Document body.
    pub fields: serde_json::Value,
}

impl RawRecord {
    /// A keyless record; `fields` must carry its own `id`.
    pub fn new(fields: serde_json::Value) -> Self {
        Self { key: None, fields }
    }

    /// A record stored under a document key.
    pub fn with_key(key: impl Into<String>, fields: serde_json::Value) -> Self {
        Self {
            key: Some(key.into()),
            fields,
        }
    }

    /// Look up a top-level field, treating JSON `null` as absent.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}

/// Identifier of one listener registered with a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);
