//! CSV export of the event feed.

use crate::error::Result;
use crate::event::Event;
use std::io::Write;

const HEADER: [&str; 14] = [
    "ID",
    "Timestamp",
    "Category",
    "Title",
    "Description",
    "Severity",
    "Sensor",
    "Location",
    "Value",
    "Unit",
    "User",
    "Resolved",
    "Resolved At",
    "Resolved By",
];

/// Write `events` as CSV, one row per event, header first.
///
/// Returns the number of rows written (excluding the header).
pub fn export_csv<W: Write>(events: &[Event], mut writer: W) -> Result<usize> {
    writeln!(writer, "{}", HEADER.join(","))?;

    for event in events {
        let row = [
            event.id.0.clone(),
            event.timestamp.format_display(),
            event.category.to_string(),
            event.title.clone(),
            event.description.clone(),
            event.severity.to_string(),
            event.sensor.clone().unwrap_or_default(),
            event.location.clone().unwrap_or_default(),
            event.value.map(|v| v.to_string()).unwrap_or_default(),
            event.unit.clone().unwrap_or_default(),
            event.user.clone().unwrap_or_default(),
            if event.is_resolved() { "Yes" } else { "No" }.to_string(),
            event
                .resolution
                .resolved_at()
                .map(|ts| ts.format_display())
                .unwrap_or_default(),
            event.resolution.resolved_by().unwrap_or_default().to_string(),
        ];
        let line: Vec<String> = row.iter().map(|f| escape(f)).collect();
        writeln!(writer, "{}", line.join(","))?;
    }

    writer.flush()?;
    Ok(events.len())
}

/// Default export file name for a given day, e.g. `event-history-2025-03-01.csv`.
pub fn export_file_name(day: chrono::NaiveDate) -> String {
    format!("event-history-{}.csv", day.format("%Y-%m-%d"))
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
