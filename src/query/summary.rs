//! Aggregates over a snapshot: dashboard stats, filter facets and the timeline.

use crate::event::{Category, Event, Severity};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Summary counts for the dashboard stat cards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventStats {
    pub total: usize,
    pub unresolved: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

impl EventStats {
    pub fn collect(events: &[Event]) -> Self {
        let mut stats = Self {
            total: events.len(),
            ..Default::default()
        };
        for event in events {
            *stats.by_category.entry(event.category).or_default() += 1;
            *stats.by_severity.entry(event.severity).or_default() += 1;
            if !event.is_resolved() {
                stats.unresolved += 1;
            }
        }
        stats
    }

    pub fn category(&self, category: Category) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn severity(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }

    /// Unresolved events at warning level or above.
    pub fn open_alerts(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| e.severity >= Severity::Warning && !e.is_resolved())
            .count()
    }
}

/// Distinct values offered as filter options, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Facets {
    pub locations: Vec<String>,
    pub sensors: Vec<String>,
    pub users: Vec<String>,
}

impl Facets {
    pub fn collect(events: &[Event]) -> Self {
        Self {
            locations: distinct(events.iter().filter_map(|e| e.location.as_deref())),
            sensors: distinct(events.iter().filter_map(|e| e.sensor.as_deref())),
            users: distinct(events.iter().filter_map(|e| e.user.as_deref())),
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Events of one UTC day.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineDay {
    pub day: NaiveDate,
    pub events: Vec<Event>,
}

/// Group events by UTC day, newest day first. Within a day, input order is kept.
pub fn timeline(events: &[Event]) -> Vec<TimelineDay> {
    let mut days: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();
    for event in events {
        if let Some(day) = event.timestamp.day() {
            days.entry(day).or_default().push(event.clone());
        }
    }
    days.into_iter()
        .rev()
        .map(|(day, events)| TimelineDay { day, events })
        .collect()
}
