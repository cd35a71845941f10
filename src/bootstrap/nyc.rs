//! Config bootstrapper for the New York City subway.
//!
//! Maps subway routes to their realtime feed endpoints and expands parent
//! stop IDs into the directional platform IDs the realtime feeds publish.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::config::{BoardConfig, CONFIG_VERSION, DEFAULT_STATIC_UPDATE_HOURS};
use crate::schedule::GtfsSchedule;

pub const STATIC_REGULAR: &str =
    "http://web.mta.info/developers/data/nyct/subway/google_transit.zip";
pub const STATIC_SUPPLEMENTAL: &str =
    "http://web.mta.info/developers/files/google_transit_supplemented.zip";

const FEED_ACE: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-ace";
const FEED_BDFM: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-bdfm";
const FEED_G: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-g";
const FEED_JZ: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-jz";
const FEED_NQRW: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-nqrw";
const FEED_L: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-l";
const FEED_IRT: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs";
const FEED_SI: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-si";
const FEED_ALERTS: &str =
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/camsys%2Fsubway-alerts";

/// Realtime endpoint for a subway route, if it is a known route.
pub fn feed_endpoint(route_id: &str) -> Option<&'static str> {
    match route_id {
        "A" | "C" | "E" => Some(FEED_ACE),
        "B" | "D" | "F" | "FX" | "M" => Some(FEED_BDFM),
        "G" => Some(FEED_G),
        "J" | "Z" => Some(FEED_JZ),
        "N" | "Q" | "R" | "W" => Some(FEED_NQRW),
        "L" => Some(FEED_L),
        "1" | "2" | "3" | "4" | "5" | "5X" | "6" | "6X" | "7" | "7X" => Some(FEED_IRT),
        "SIR" => Some(FEED_SI),
        _ => None,
    }
}

/// Expands a stop ID into directional platform IDs: a bare parent station
/// gets both the northbound and southbound child, an already-directional ID
/// is kept as-is.
pub fn expand_stop(stop_id: &str) -> Vec<String> {
    if stop_id.ends_with('N') || stop_id.ends_with('S') {
        vec![stop_id.to_string()]
    } else {
        vec![format!("{stop_id}N"), format!("{stop_id}S")]
    }
}

/// Builds a board config for the given subway routes and stops.
///
/// Fetches the MTA static schedule to validate route selections and name
/// the chosen platforms; network failures only downgrade that validation,
/// never the bootstrap itself.
pub async fn subway(
    route_ids: &[String],
    stop_ids: &[String],
    api_key: Option<String>,
    route_icons: Option<String>,
) -> BoardConfig {
    info!(
        routes = route_ids.len(),
        stops = stop_ids.len(),
        has_api_key = api_key.is_some(),
        "Generating config for NYC Subway"
    );

    let schedule = match GtfsSchedule::build(&[STATIC_REGULAR, STATIC_SUPPLEMENTAL]).await {
        Ok(schedule) => Some(schedule),
        Err(e) => {
            warn!(error = %e, "Static schedule unavailable; skipping route validation");
            None
        }
    };

    subway_with_schedule(route_ids, stop_ids, api_key, route_icons, schedule.as_ref())
}

/// Offline core of [`subway`]: pass a pre-loaded schedule (or `None`) to
/// skip the network entirely.
pub fn subway_with_schedule(
    route_ids: &[String],
    stop_ids: &[String],
    api_key: Option<String>,
    route_icons: Option<String>,
    schedule: Option<&GtfsSchedule>,
) -> BoardConfig {
    let mut endpoints = BTreeSet::new();
    endpoints.insert(FEED_ALERTS.to_string());
    for route_id in route_ids {
        match feed_endpoint(route_id) {
            Some(endpoint) => {
                endpoints.insert(endpoint.to_string());
            }
            None => warn!(route_id = %route_id, "Route has no known realtime feed"),
        }
    }

    if let Some(schedule) = schedule {
        for route_id in route_ids {
            let known = schedule.routes.contains(route_id)
                || schedule.trips.route_ids().any(|r| r == route_id.as_str());
            if !known {
                warn!(route_id = %route_id, "Route ID is not in the static schedule");
            }
        }
    }

    let mut expanded_stops = Vec::new();
    for stop_id in stop_ids {
        for platform in expand_stop(stop_id) {
            if let Some(schedule) = schedule {
                info!(stop_id = %platform, name = %schedule.stops.name_or_id(&platform), "Adding platform");
            }
            expanded_stops.push(platform);
        }
    }

    let gtfs_static_data = vec![STATIC_REGULAR.to_string(), STATIC_SUPPLEMENTAL.to_string()];
    let static_sources_update_frequency = gtfs_static_data
        .iter()
        .map(|source| (source.clone(), DEFAULT_STATIC_UPDATE_HOURS))
        .collect();

    BoardConfig {
        version: CONFIG_VERSION,
        api_key,
        api_key_param: None,
        url_endpoints: endpoints.into_iter().collect(),
        gtfs_static_data,
        static_sources_update_frequency,
        route_ids: route_ids.to_vec(),
        stop_ids: expanded_stops,
        arrival_limit: crate::config::DEFAULT_ARRIVAL_LIMIT,
        route_icons,
        language: None,
        realtime_update_seconds: None,
    }
}
