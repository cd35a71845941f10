//! Display formatting and persistence for board state.
//!
//! Renders arrival countdowns for the CLI board and appends per-poll
//! arrival observations to CSV for offline analysis.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::debug;

use crate::coordinator::Snapshot;
use crate::entity::{ATTR_ROUTE_ID, Entity, EntityRegistry};

/// Human countdown for an arrival sensor state: `"due"` under a minute,
/// whole minutes otherwise, `"--"` when no arrival is known.
pub fn format_countdown(seconds: Option<i64>) -> String {
    match seconds {
        None => "--".to_string(),
        Some(seconds) => {
            let minutes = (seconds + 30) / 60;
            if minutes <= 0 {
                "due".to_string()
            } else {
                format!("{minutes} min")
            }
        }
    }
}

/// One rendered line per entity, arrivals first.
pub fn board_lines(registry: &EntityRegistry) -> Vec<String> {
    let mut lines = Vec::with_capacity(registry.len());
    for sensor in &registry.arrival_sensors {
        let route = sensor
            .attributes()
            .get(ATTR_ROUTE_ID)
            .map(|route_id| format!(" ({route_id})"))
            .unwrap_or_default();
        lines.push(format!(
            "{} — {}{}",
            sensor.name(),
            format_countdown(sensor.state_seconds()),
            route
        ));
    }
    for sensor in &registry.alert_sensors {
        let state = if sensor.is_on() {
            let header = sensor
                .attributes()
                .get("header_0")
                .cloned()
                .unwrap_or_default();
            format!("ALERT {header}")
        } else {
            "clear".to_string()
        };
        lines.push(format!("{} — {}", sensor.name(), state));
    }
    lines
}

/// A single observed arrival, one CSV row.
#[derive(Debug, Serialize)]
pub struct ArrivalRecord {
    pub timestamp: DateTime<Utc>,
    pub stop_id: String,
    pub route_id: String,
    pub trip_id: String,
    pub seconds_to_arrival: i64,
}

/// Flattens a snapshot into arrival records, stops sorted for stable output.
pub fn records_from_snapshot(snapshot: &Snapshot) -> Vec<ArrivalRecord> {
    let mut stop_ids: Vec<&String> = snapshot.station_stops.keys().collect();
    stop_ids.sort();

    let mut records = Vec::new();
    for stop_id in stop_ids {
        let stop = &snapshot.station_stops[stop_id];
        for arrival in &stop.arrivals {
            records.push(ArrivalRecord {
                timestamp: snapshot.updated_at,
                stop_id: stop_id.clone(),
                route_id: arrival.route_id.clone(),
                trip_id: arrival.trip_id.clone(),
                seconds_to_arrival: arrival.seconds_until(snapshot.updated_at),
            });
        }
    }
    records
}

/// Appends arrival records as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &str, records: &[ArrivalRecord]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}
