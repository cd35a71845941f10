//! Diagnostics dump for support requests. Secrets are redacted.

use serde_json::{Value, json};

use crate::config::BoardConfig;
use crate::coordinator::Coordinator;
use crate::fetch::HttpClient;

const REDACTED: &str = "**REDACTED**";

/// Serializes the config with the API key redacted.
pub fn redacted_config(config: &BoardConfig) -> Value {
    let mut value = serde_json::to_value(config).unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        if object.contains_key("api_key") {
            object.insert("api_key".to_string(), Value::String(REDACTED.to_string()));
        }
    }
    value
}

/// Full diagnostics for one configured board: redacted config, static
/// refresh bookkeeping, and hub/schedule summary counts.
pub fn config_entry_diagnostics<C: HttpClient + Send + Sync + 'static>(
    config: &BoardConfig,
    coordinator: &Coordinator<C>,
) -> Value {
    let last_update: serde_json::Map<String, Value> = coordinator
        .last_static_update()
        .iter()
        .map(|(source, at)| (source.clone(), Value::String(at.to_rfc3339())))
        .collect();

    let interval_hours: serde_json::Map<String, Value> = coordinator
        .static_intervals()
        .iter()
        .map(|(source, interval)| (source.clone(), json!(interval.num_hours())))
        .collect();

    let mut pending: Vec<&String> = coordinator.pending_static_targets().iter().collect();
    pending.sort();

    let schedule = coordinator.schedule();
    json!({
        "config": redacted_config(config),
        "static": {
            "last_update": last_update,
            "interval_hours": interval_hours,
            "pending_targets": pending,
        },
        "schedule": {
            "stops": schedule.stops.len(),
            "trips": schedule.trips.len(),
            "routes": schedule.routes.len(),
        },
        "hub": {
            "feed_urls": coordinator.hub().feed_urls().len(),
            "subscribed_stops": coordinator.hub().subscribed_stops(),
            "subscribed_routes": coordinator.hub().subscribed_routes(),
        },
    })
}
