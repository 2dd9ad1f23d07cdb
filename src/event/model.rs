//! The typed event shape and its closed vocabularies.

use crate::types::{EventId, Timestamp};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// What part of the farm an event is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sensor,
    Alert,
    Maintenance,
    Harvest,
    Planting,
    System,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Sensor,
        Category::Alert,
        Category::Maintenance,
        Category::Harvest,
        Category::Planting,
        Category::System,
        Category::Other,
    ];

    /// Parse the lowercase wire name. Anything else is outside the vocabulary.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sensor => "sensor",
            Category::Alert => "alert",
            Category::Maintenance => "maintenance",
            Category::Harvest => "harvest",
            Category::Planting => "planting",
            Category::System => "system",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgent an event is. Ordered by increasing urgency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Success,
        Severity::Warning,
        Severity::Error,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Urgency rank, 0 for the least urgent.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether someone has dealt with an event.
///
/// `at`/`by` only exist on the resolved variant, so an unresolved event can
/// never carry resolution details.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Unresolved,
    Resolved {
        at: Option<Timestamp>,
        by: Option<String>,
    },
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }

    pub fn resolved_at(&self) -> Option<Timestamp> {
        match self {
            Resolution::Resolved { at, .. } => *at,
            Resolution::Unresolved => None,
        }
    }

    pub fn resolved_by(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { by, .. } => by.as_deref(),
            Resolution::Unresolved => None,
        }
    }
}

/// A measured quantity attached to an event.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: Option<String>,
}

/// A single validated dashboard event.
///
/// Serializes to the store's document shape (`resolved`, `resolvedAt`,
/// `resolvedBy`, RFC 3339 timestamps), so the output is accepted by
/// [`Event::from_raw`].
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: EventId,

    /// When the event happened (not when it was synchronized).
    pub timestamp: Timestamp,

    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub description: String,

    /// Source sensor identifier.
    pub sensor: Option<String>,
    pub location: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,

    /// Actor who triggered the event.
    pub user: Option<String>,

    pub resolution: Resolution,
}

impl Event {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_resolved()
    }

    /// Value and unit together, when a value was reported.
    pub fn measurement(&self) -> Option<Measurement> {
        self.value.map(|value| Measurement {
            value,
            unit: self.unit.clone(),
        })
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("timestamp", &self.timestamp.to_rfc3339())?;
        map.serialize_entry("category", &self.category)?;
        map.serialize_entry("severity", &self.severity)?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("description", &self.description)?;

        if let Some(sensor) = &self.sensor {
            map.serialize_entry("sensor", sensor)?;
        }
        if let Some(location) = &self.location {
            map.serialize_entry("location", location)?;
        }
        if let Some(value) = self.value {
            map.serialize_entry("value", &value)?;
        }
        if let Some(unit) = &self.unit {
            map.serialize_entry("unit", unit)?;
        }
        if let Some(user) = &self.user {
            map.serialize_entry("user", user)?;
        }

        if let Resolution::Resolved { at, by } = &self.resolution {
            map.serialize_entry("resolved", &true)?;
            if let Some(at) = at {
                map.serialize_entry("resolvedAt", &at.to_rfc3339())?;
            }
            if let Some(by) = by {
                map.serialize_entry("resolvedBy", by)?;
            }
        }
        map.end()
    }
}
