use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{
    ATTR_HEADSIGN, ATTR_ROUTE_COLOR, ATTR_ROUTE_ID, ATTR_ROUTE_TEXT_COLOR, ATTR_ROUTE_TYPE,
    ATTR_TRIP_ID, Entity,
};
use crate::coordinator::Snapshot;
use crate::schedule::GtfsSchedule;

/// Countdown sensor for the `idx`-th soonest arrival at one stop.
///
/// State is seconds until arrival, clamped at zero; arrivals already in the
/// feed's past display as due rather than negative.
pub struct ArrivalSensor {
    stop_id: String,
    idx: usize,
    name: String,
    route_icons: Option<PathBuf>,
    state: Option<i64>,
    attributes: BTreeMap<String, String>,
}

impl ArrivalSensor {
    pub fn new(
        stop_id: String,
        idx: usize,
        schedule: &GtfsSchedule,
        route_icons: Option<&str>,
    ) -> Self {
        let name = format!("{}: {}", idx + 1, schedule.stops.name_or_id(&stop_id));
        Self {
            stop_id,
            idx,
            name,
            route_icons: route_icons.map(PathBuf::from),
            state: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn stop_id(&self) -> &str {
        &self.stop_id
    }

    /// Seconds until arrival, or `None` when fewer arrivals are known.
    pub fn state_seconds(&self) -> Option<i64> {
        self.state
    }

    /// Arrival detail attributes (route, trip, headsign, route colors).
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Path to the route icon for the current arrival, when configured.
    pub fn entity_picture(&self) -> Option<PathBuf> {
        let dir = self.route_icons.as_ref()?;
        let route_id = self.attributes.get(ATTR_ROUTE_ID)?;
        Some(dir.join(format!("{route_id}.svg")))
    }

    pub fn icon(&self) -> &'static str {
        "mdi:bus-clock"
    }
}

impl Entity for ArrivalSensor {
    fn unique_id(&self) -> String {
        format!("arrival_{}_{}", self.stop_id, self.idx)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn update(&mut self, snapshot: &Snapshot) {
        self.attributes.clear();
        let arrival = snapshot
            .station_stops
            .get(&self.stop_id)
            .and_then(|stop| stop.arrivals.get(self.idx));

        let Some(arrival) = arrival else {
            self.state = None;
            return;
        };

        self.state = Some(arrival.seconds_until(snapshot.updated_at).max(0));
        self.attributes
            .insert(ATTR_ROUTE_ID.to_string(), arrival.route_id.clone());

        let schedule = &snapshot.schedule;
        if let Some(trip) = schedule.trips.get_close_match(
            &arrival.trip_id,
            &schedule.calendar,
            snapshot.updated_at.date_naive(),
        ) {
            self.attributes
                .insert(ATTR_TRIP_ID.to_string(), trip.trip_id.clone());
            if let Some(headsign) = &trip.headsign {
                self.attributes
                    .insert(ATTR_HEADSIGN.to_string(), headsign.clone());
            }
        }

        if let Some(route) = schedule.routes.get(&arrival.route_id) {
            self.attributes
                .insert(ATTR_ROUTE_COLOR.to_string(), route.color.clone());
            self.attributes
                .insert(ATTR_ROUTE_TEXT_COLOR.to_string(), route.text_color.clone());
            self.attributes
                .insert(ATTR_ROUTE_TYPE.to_string(), route.route_type.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Snapshot;
    use crate::hub::{Arrival, StationStop};
    use crate::schedule::{RouteInfo, Service, StationStopInfo, TripInfo};
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn schedule() -> GtfsSchedule {
        let mut schedule = GtfsSchedule::default();
        schedule.stops.insert(StationStopInfo {
            id: "101N".to_string(),
            name: Some("Van Cortlandt Park-242 St".to_string()),
            parent_station: Some("101".to_string()),
        });
        schedule.routes.insert(RouteInfo {
            route_id: "1".to_string(),
            short_name: Some("1".to_string()),
            long_name: Some("Broadway - 7 Avenue Local".to_string()),
            route_type: "Subway".to_string(),
            color: "#EE352E".to_string(),
            text_color: "#FFFFFF".to_string(),
        });
        schedule.trips.insert(TripInfo {
            trip_id: "WKD_123456_1..N03R".to_string(),
            route_id: "1".to_string(),
            service_id: "WKD".to_string(),
            headsign: Some("Van Cortlandt Park".to_string()),
        });
        schedule.calendar.insert_service(Service {
            service_id: "WKD".to_string(),
            weekdays: [true; 7],
            start: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        });
        schedule
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn snapshot_with_arrivals(times: &[i64]) -> Snapshot {
        let mut stop = StationStop::new("101N");
        for offset in times {
            stop.arrivals.push(Arrival {
                route_id: "1".to_string(),
                trip_id: "123456_1..N03R".to_string(),
                time: now() + chrono::Duration::seconds(*offset),
            });
        }
        stop.arrivals.sort_by_key(|a| a.time);
        let mut station_stops = HashMap::new();
        station_stops.insert("101N".to_string(), stop);
        Snapshot {
            station_stops,
            route_statuses: HashMap::new(),
            schedule: Arc::new(schedule()),
            feeds_ok: 1,
            feeds_failed: 0,
            updated_at: now(),
        }
    }

    #[test]
    fn test_name_uses_static_stop_name() {
        let sensor = ArrivalSensor::new("101N".to_string(), 0, &schedule(), None);
        assert_eq!(sensor.name(), "1: Van Cortlandt Park-242 St");
        assert_eq!(sensor.unique_id(), "arrival_101N_0");
    }

    #[test]
    fn test_name_falls_back_to_stop_id() {
        let sensor = ArrivalSensor::new("999X".to_string(), 2, &GtfsSchedule::default(), None);
        assert_eq!(sensor.name(), "3: 999X");
    }

    #[test]
    fn test_update_sets_countdown_and_attributes() {
        let mut sensor = ArrivalSensor::new("101N".to_string(), 0, &schedule(), None);
        sensor.update(&snapshot_with_arrivals(&[240, 360]));

        assert_eq!(sensor.state_seconds(), Some(240));
        assert_eq!(sensor.attributes()[ATTR_ROUTE_ID], "1");
        assert_eq!(sensor.attributes()[ATTR_TRIP_ID], "WKD_123456_1..N03R");
        assert_eq!(sensor.attributes()[ATTR_HEADSIGN], "Van Cortlandt Park");
        assert_eq!(sensor.attributes()[ATTR_ROUTE_COLOR], "#EE352E");
        assert_eq!(sensor.attributes()[ATTR_ROUTE_TYPE], "Subway");
    }

    #[test]
    fn test_update_clamps_past_arrivals_to_zero() {
        let mut sensor = ArrivalSensor::new("101N".to_string(), 0, &schedule(), None);
        sensor.update(&snapshot_with_arrivals(&[-600, 240]));
        assert_eq!(sensor.state_seconds(), Some(0));
    }

    #[test]
    fn test_update_beyond_available_arrivals_is_unknown() {
        let mut sensor = ArrivalSensor::new("101N".to_string(), 3, &schedule(), None);
        sensor.update(&snapshot_with_arrivals(&[240]));
        assert_eq!(sensor.state_seconds(), None);
        assert!(sensor.attributes().is_empty());
    }

    #[test]
    fn test_entity_picture() {
        let mut sensor = ArrivalSensor::new("101N".to_string(), 0, &schedule(), Some("/icons"));
        assert_eq!(sensor.entity_picture(), None);

        sensor.update(&snapshot_with_arrivals(&[240]));
        assert_eq!(sensor.entity_picture(), Some(PathBuf::from("/icons/1.svg")));
    }
}
