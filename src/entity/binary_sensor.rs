use std::collections::BTreeMap;

use super::Entity;
use crate::coordinator::Snapshot;
use crate::hub::AlertInfo;
use crate::schedule::GtfsSchedule;

/// The stop or route an alert sensor reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InformedEntity {
    Route(String),
    Stop(String),
}

impl InformedEntity {
    pub fn id(&self) -> &str {
        match self {
            InformedEntity::Route(id) | InformedEntity::Stop(id) => id,
        }
    }
}

/// Binary problem sensor: on while any service alert is active for its
/// informed entity. Alert text is exposed as `header_N` / `description_N`
/// attributes in the configured language.
pub struct AlertSensor {
    informed: InformedEntity,
    language: String,
    name: String,
    is_on: bool,
    attributes: BTreeMap<String, String>,
}

impl AlertSensor {
    pub fn new(informed: InformedEntity, language: &str, schedule: &GtfsSchedule) -> Self {
        let display = match &informed {
            InformedEntity::Route(route_id) => route_id.clone(),
            InformedEntity::Stop(stop_id) => schedule.stops.name_or_id(stop_id),
        };
        Self {
            name: format!("{display} Service Alerts"),
            informed,
            language: language.to_string(),
            is_on: false,
            attributes: Self::clean_alert_data(),
        }
    }

    fn clean_alert_data() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("header_0".to_string(), String::new()),
            ("description_0".to_string(), String::new()),
        ])
    }

    pub fn informed_entity(&self) -> &InformedEntity {
        &self.informed
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn device_class(&self) -> &'static str {
        "problem"
    }

    fn alerts_in<'a>(&self, snapshot: &'a Snapshot) -> &'a [AlertInfo] {
        match &self.informed {
            InformedEntity::Route(route_id) => snapshot
                .route_statuses
                .get(route_id)
                .map(|status| status.alerts.as_slice())
                .unwrap_or_default(),
            InformedEntity::Stop(stop_id) => snapshot
                .station_stops
                .get(stop_id)
                .map(|stop| stop.alerts.as_slice())
                .unwrap_or_default(),
        }
    }
}

impl Entity for AlertSensor {
    fn unique_id(&self) -> String {
        format!("alert_{}", self.informed.id())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn update(&mut self, snapshot: &Snapshot) {
        let alerts = self.alerts_in(snapshot);
        if alerts.is_empty() {
            self.is_on = false;
            self.attributes = Self::clean_alert_data();
            return;
        }
        self.is_on = true;
        self.attributes.clear();
        for (i, alert) in alerts.iter().enumerate() {
            self.attributes.insert(
                format!("header_{i}"),
                alert.header_for(&self.language).to_string(),
            );
            self.attributes.insert(
                format!("description_{i}"),
                alert.description_for(&self.language).to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{RouteStatus, StationStop};
    use crate::schedule::StationStopInfo;
    use chrono::DateTime;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn alert(header: &str, description: &str) -> AlertInfo {
        AlertInfo {
            header_text: HashMap::from([("en".to_string(), header.to_string())]),
            description_text: HashMap::from([("en".to_string(), description.to_string())]),
        }
    }

    fn snapshot(route_alerts: Vec<AlertInfo>, stop_alerts: Vec<AlertInfo>) -> Snapshot {
        let mut route_status = RouteStatus::new("A");
        route_status.alerts = route_alerts;
        let mut stop = StationStop::new("101N");
        stop.alerts = stop_alerts;
        Snapshot {
            station_stops: HashMap::from([("101N".to_string(), stop)]),
            route_statuses: HashMap::from([("A".to_string(), route_status)]),
            schedule: Arc::new(GtfsSchedule::default()),
            feeds_ok: 1,
            feeds_failed: 0,
            updated_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_route_alert_sensor_turns_on() {
        let mut sensor = AlertSensor::new(
            InformedEntity::Route("A".to_string()),
            "en",
            &GtfsSchedule::default(),
        );
        assert_eq!(sensor.name(), "A Service Alerts");
        assert_eq!(sensor.unique_id(), "alert_A");
        assert!(!sensor.is_on());

        sensor.update(&snapshot(
            vec![alert("Delays", "Signal problems at 96 St")],
            vec![],
        ));

        assert!(sensor.is_on());
        assert_eq!(sensor.attributes()["header_0"], "Delays");
        assert_eq!(sensor.attributes()["description_0"], "Signal problems at 96 St");
    }

    #[test]
    fn test_sensor_resets_to_clean_state() {
        let mut sensor = AlertSensor::new(
            InformedEntity::Route("A".to_string()),
            "en",
            &GtfsSchedule::default(),
        );
        sensor.update(&snapshot(vec![alert("Delays", "details")], vec![]));
        assert!(sensor.is_on());

        sensor.update(&snapshot(vec![], vec![]));
        assert!(!sensor.is_on());
        assert_eq!(sensor.attributes()["header_0"], "");
        assert_eq!(sensor.attributes()["description_0"], "");
    }

    #[test]
    fn test_multiple_alerts_enumerated() {
        let mut sensor = AlertSensor::new(
            InformedEntity::Route("A".to_string()),
            "en",
            &GtfsSchedule::default(),
        );
        sensor.update(&snapshot(
            vec![alert("First", "one"), alert("Second", "two")],
            vec![],
        ));
        assert_eq!(sensor.attributes()["header_0"], "First");
        assert_eq!(sensor.attributes()["header_1"], "Second");
        assert_eq!(sensor.attributes().len(), 4);
    }

    #[test]
    fn test_stop_alert_sensor_uses_stop_name() {
        let mut schedule = GtfsSchedule::default();
        schedule.stops.insert(StationStopInfo {
            id: "101N".to_string(),
            name: Some("Van Cortlandt Park-242 St".to_string()),
            parent_station: None,
        });
        let mut sensor = AlertSensor::new(InformedEntity::Stop("101N".to_string()), "en", &schedule);
        assert_eq!(sensor.name(), "Van Cortlandt Park-242 St Service Alerts");

        sensor.update(&snapshot(vec![], vec![alert("Elevator outage", "")]));
        assert!(sensor.is_on());
    }
}
