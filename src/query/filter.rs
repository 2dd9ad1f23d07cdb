//! Feed filtering.

use crate::event::{Category, Event, Severity};
use chrono::NaiveDate;

/// Inclusive range of whole UTC days.
///
/// With no `to`, the range covers the `from` day only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn day(day: NaiveDate) -> Self {
        Self { from: day, to: None }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to: Some(to) }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        let to = self.to.unwrap_or(self.from);
        day >= self.from && day <= to
    }
}

/// Criteria for narrowing the event feed.
///
/// Every empty list means "no constraint".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventFilter {
    /// Case-insensitive substring over title, description, sensor and location.
    pub search: String,
    pub date_range: Option<DateRange>,
    pub categories: Vec<Category>,
    pub severities: Vec<Severity>,
    pub locations: Vec<String>,
    pub sensors: Vec<String>,
    pub users: Vec<String>,
    pub only_unresolved: bool,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    pub fn severities(mut self, severities: Vec<Severity>) -> Self {
        self.severities = severities;
        self
    }

    pub fn locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    pub fn sensors(mut self, sensors: Vec<String>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn users(mut self, users: Vec<String>) -> Self {
        self.users = users;
        self
    }

    pub fn only_unresolved(mut self, only: bool) -> Self {
        self.only_unresolved = only;
        self
    }

    /// Add the category if absent, remove it if present.
    pub fn toggle_category(&mut self, category: Category) {
        toggle(&mut self.categories, category);
    }

    pub fn toggle_severity(&mut self, severity: Severity) {
        toggle(&mut self.severities, severity);
    }

    pub fn toggle_location(&mut self, location: &str) {
        toggle(&mut self.locations, location.to_string());
    }

    pub fn toggle_sensor(&mut self, sensor: &str) {
        toggle(&mut self.sensors, sensor.to_string());
    }

    pub fn toggle_user(&mut self, user: &str) {
        toggle(&mut self.users, user.to_string());
    }

    /// True if no criterion is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, event: &Event) -> bool {
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            let hit = contains_ci(&event.title, &needle)
                || contains_ci(&event.description, &needle)
                || event.sensor.as_deref().is_some_and(|s| contains_ci(s, &needle))
                || event.location.as_deref().is_some_and(|s| contains_ci(s, &needle));
            if !hit {
                return false;
            }
        }

        if let Some(range) = &self.date_range {
            match event.timestamp.day() {
                Some(day) if range.contains(day) => {}
                _ => return false,
            }
        }

        if !self.categories.is_empty() && !self.categories.contains(&event.category) {
            return false;
        }
        if !self.severities.is_empty() && !self.severities.contains(&event.severity) {
            return false;
        }
        if !one_of(&self.locations, event.location.as_deref()) {
            return false;
        }
        if !one_of(&self.sensors, event.sensor.as_deref()) {
            return false;
        }
        if !one_of(&self.users, event.user.as_deref()) {
            return false;
        }

        !(self.only_unresolved && event.is_resolved())
    }

    /// Matching events, in their original order.
    pub fn apply(&self, events: &[Event]) -> Vec<Event> {
        events.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}

fn toggle<T: PartialEq>(list: &mut Vec<T>, item: T) {
    match list.iter().position(|x| *x == item) {
        Some(pos) => {
            list.remove(pos);
        }
        None => list.push(item),
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// An event without the field never matches a non-empty list.
fn one_of(allowed: &[String], value: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    value.is_some_and(|v| allowed.iter().any(|a| a == v))
}
