//! Entity layer: renderable state values built from coordinator snapshots.
//!
//! Entities are plain structs; a host surface (the CLI board, tests, or an
//! embedding application) drives them by applying each published
//! [`Snapshot`]. Control entities talk back to the coordinator through a
//! [`CoordinatorHandle`].

mod binary_sensor;
mod button;
mod number;
mod sensor;

pub use binary_sensor::{AlertSensor, InformedEntity};
pub use button::{ClearStaticButton, RefreshStaticButton};
pub use number::StaticIntervalNumber;
pub use sensor::ArrivalSensor;

use crate::config::BoardConfig;
use crate::coordinator::{CoordinatorHandle, Snapshot};
use crate::fetch::HttpClient;
use crate::hub::RealtimeHub;
use crate::schedule::GtfsSchedule;

// User-facing attribute keys.
pub const ATTR_ROUTE_ID: &str = "route_id";
pub const ATTR_TRIP_ID: &str = "Trip ID";
pub const ATTR_HEADSIGN: &str = "Headsign";
pub const ATTR_ROUTE_COLOR: &str = "Route Color";
pub const ATTR_ROUTE_TEXT_COLOR: &str = "Route Text Color";
pub const ATTR_ROUTE_TYPE: &str = "Route Type";

pub trait Entity {
    fn unique_id(&self) -> String;
    fn name(&self) -> String;
    /// Recomputes state from a coordinator snapshot. Control entities have
    /// no snapshot-derived state and keep the default no-op.
    fn update(&mut self, _snapshot: &Snapshot) {}
}

/// Registers the configured stops and routes with the hub so polls retain
/// data for them.
pub fn subscribe_informed_entities<C: HttpClient + Send + Sync + 'static>(
    hub: &mut RealtimeHub<C>,
    config: &BoardConfig,
) {
    for stop_id in &config.stop_ids {
        hub.subscribe_stop(stop_id.clone());
    }
    for route_id in &config.route_ids {
        hub.subscribe_route(route_id.clone());
    }
}

/// All entities for one configured board.
pub struct EntityRegistry {
    pub arrival_sensors: Vec<ArrivalSensor>,
    pub alert_sensors: Vec<AlertSensor>,
    pub static_numbers: Vec<StaticIntervalNumber>,
    pub refresh_buttons: Vec<RefreshStaticButton>,
    pub clear_button: ClearStaticButton,
}

impl EntityRegistry {
    /// Builds the full entity set for a validated config: `arrival_limit`
    /// sensors per stop, one alert sensor per route and per stop, one
    /// interval number and refresh button per static source, and a single
    /// clear-all button.
    pub fn from_config(
        config: &BoardConfig,
        schedule: &GtfsSchedule,
        handle: CoordinatorHandle,
    ) -> Self {
        let mut arrival_sensors = Vec::new();
        for stop_id in &config.stop_ids {
            for idx in 0..config.arrival_limit {
                arrival_sensors.push(ArrivalSensor::new(
                    stop_id.clone(),
                    idx,
                    schedule,
                    config.route_icons.as_deref(),
                ));
            }
        }

        let mut alert_sensors = Vec::new();
        for route_id in &config.route_ids {
            alert_sensors.push(AlertSensor::new(
                InformedEntity::Route(route_id.clone()),
                config.language(),
                schedule,
            ));
        }
        for stop_id in &config.stop_ids {
            alert_sensors.push(AlertSensor::new(
                InformedEntity::Stop(stop_id.clone()),
                config.language(),
                schedule,
            ));
        }

        let static_numbers = config
            .gtfs_static_data
            .iter()
            .map(|source| {
                StaticIntervalNumber::new(
                    source.clone(),
                    config.static_update_frequency(source).num_hours().max(1) as u64,
                    handle.clone(),
                )
            })
            .collect();

        let refresh_buttons = config
            .gtfs_static_data
            .iter()
            .map(|source| RefreshStaticButton::new(Some(source.clone()), handle.clone()))
            .collect();

        Self {
            arrival_sensors,
            alert_sensors,
            static_numbers,
            refresh_buttons,
            clear_button: ClearStaticButton::new(handle),
        }
    }

    pub fn update_all(&mut self, snapshot: &Snapshot) {
        for sensor in &mut self.arrival_sensors {
            sensor.update(snapshot);
        }
        for sensor in &mut self.alert_sensors {
            sensor.update(snapshot);
        }
    }

    /// Total number of entities, the always-present clear button included.
    pub fn len(&self) -> usize {
        self.arrival_sensors.len()
            + self.alert_sensors.len()
            + self.static_numbers.len()
            + self.refresh_buttons.len()
            + 1
    }
}
