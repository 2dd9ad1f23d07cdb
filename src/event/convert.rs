//! Validation boundary between raw store documents and typed events.

use super::model::{Category, Event, Resolution, Severity};
use crate::error::MalformedEventError;
use crate::types::{EventId, RawRecord, Timestamp};
use serde_json::Value;
use tracing::warn;

type FieldResult<T> = std::result::Result<T, MalformedEventError>;

impl Event {
    /// Convert a raw document into an event.
    ///
    /// Fails on the first required field that is absent or invalid. Optional
    /// fields are passed through, but a present optional field of the wrong
    /// type is still rejected.
    pub fn from_raw(raw: &RawRecord) -> FieldResult<Event> {
        let id = match raw.field("id") {
            Some(Value::String(s)) => EventId(s.clone()),
            Some(_) => return Err(MalformedEventError::wrong_type("id", "string")),
            None => match &raw.key {
                Some(key) => EventId(key.clone()),
                None => return Err(MalformedEventError::missing("id")),
            },
        };

        let timestamp = required_timestamp(raw, "timestamp")?;

        let category = {
            let s = required_str(raw, "category")?;
            Category::parse(s).ok_or_else(|| MalformedEventError::unknown_variant("category", s))?
        };

        let severity = {
            let s = required_str(raw, "severity")?;
            Severity::parse(s).ok_or_else(|| MalformedEventError::unknown_variant("severity", s))?
        };

        let title = required_str(raw, "title")?.to_string();
        let description = required_str(raw, "description")?.to_string();

        Ok(Event {
            id,
            timestamp,
            category,
            severity,
            title,
            description,
            sensor: optional_str(raw, "sensor")?,
            location: optional_str(raw, "location")?,
            value: optional_number(raw, "value")?,
            unit: optional_str(raw, "unit")?,
            user: optional_str(raw, "user")?,
            resolution: resolution(raw)?,
        })
    }
}

fn required_str<'a>(raw: &'a RawRecord, field: &str) -> FieldResult<&'a str> {
    match raw.field(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(MalformedEventError::wrong_type(field, "string")),
        None => Err(MalformedEventError::missing(field)),
    }
}

fn optional_str(raw: &RawRecord, field: &str) -> FieldResult<Option<String>> {
    match raw.field(field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MalformedEventError::wrong_type(field, "string")),
        None => Ok(None),
    }
}

fn optional_number(raw: &RawRecord, field: &str) -> FieldResult<Option<f64>> {
    match raw.field(field) {
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| MalformedEventError::wrong_type(field, "number")),
        Some(_) => Err(MalformedEventError::wrong_type(field, "number")),
        None => Ok(None),
    }
}

fn required_timestamp(raw: &RawRecord, field: &str) -> FieldResult<Timestamp> {
    match raw.field(field) {
        Some(v) => parse_timestamp(v).ok_or_else(|| MalformedEventError::wrong_type(field, "timestamp")),
        None => Err(MalformedEventError::missing(field)),
    }
}

fn optional_timestamp(raw: &RawRecord, field: &str) -> FieldResult<Option<Timestamp>> {
    match raw.field(field) {
        Some(v) => parse_timestamp(v)
            .map(Some)
            .ok_or_else(|| MalformedEventError::wrong_type(field, "timestamp")),
        None => Ok(None),
    }
}

/// Accepts epoch milliseconds, RFC 3339 strings, and `{seconds, nanoseconds}`
/// objects (with or without the leading underscore).
pub(crate) fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(n) => {
            if let Some(ms) = n.as_i64() {
                Some(Timestamp::from_millis(ms))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| Timestamp((f * 1_000.0) as i64))
            }
        }
        Value::String(s) => Timestamp::parse_rfc3339(s),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            Some(Timestamp::from_parts(seconds, nanos))
        }
        _ => None,
    }
}

fn resolution(raw: &RawRecord) -> FieldResult<Resolution> {
    let resolved = match raw.field("resolved") {
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(MalformedEventError::wrong_type("resolved", "boolean")),
        None => false,
    };

    let at = optional_timestamp(raw, "resolvedAt")?;
    let by = optional_str(raw, "resolvedBy")?;

    if resolved {
        return Ok(Resolution::Resolved { at, by });
    }
    if at.is_some() {
        return Err(MalformedEventError::inconsistent("resolvedAt"));
    }
    if by.is_some() {
        return Err(MalformedEventError::inconsistent("resolvedBy"));
    }
    Ok(Resolution::Unresolved)
}

/// A record dropped during materialization.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedRecord {
    /// Position in the batch as delivered by the store.
    pub index: usize,
    pub key: Option<String>,
    pub error: MalformedEventError,
}

/// Result of converting a batch of raw records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Materialized {
    /// Valid events, in store order.
    pub events: Vec<Event>,
    pub rejected: Vec<RejectedRecord>,
}

/// Convert a batch, dropping (and logging) every record that fails validation.
///
/// A bad record never fails the batch.
pub fn materialize(records: &[RawRecord]) -> Materialized {
    let mut out = Materialized {
        events: Vec::with_capacity(records.len()),
        rejected: Vec::new(),
    };

    for (index, raw) in records.iter().enumerate() {
        match Event::from_raw(raw) {
            Ok(event) => out.events.push(event),
            Err(error) => {
                warn!(
                    index,
                    key = raw.key.as_deref().unwrap_or(""),
                    %error,
                    "dropping malformed event record"
                );
                out.rejected.push(RejectedRecord {
                    index,
                    key: raw.key.clone(),
                    error,
                });
            }
        }
    }

    out
}
