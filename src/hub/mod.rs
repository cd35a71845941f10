//! Realtime feed hub: fetches the configured GTFS-realtime endpoints,
//! decodes them, and dispatches trip updates and alerts to the subscribed
//! stops and routes.

pub mod alert;
pub mod arrival;

pub use alert::{AlertInfo, RouteStatus, alert_active_at};
pub use arrival::{Arrival, StationStop};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use prost::Message;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::fetch::{HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedMessage;
use crate::gtfs_rt::trip_update::stop_time_update::ScheduleRelationship;

/// Decodes a protobuf-encoded GTFS-realtime [`FeedMessage`] from raw bytes.
pub fn decode_feed(bytes: &[u8]) -> Result<FeedMessage> {
    FeedMessage::decode(bytes).context("decoding GTFS-realtime feed message")
}

/// Merged realtime state produced by one poll of every configured feed.
#[derive(Debug, Clone, Default)]
pub struct RealtimeData {
    pub station_stops: HashMap<String, StationStop>,
    pub route_statuses: HashMap<String, RouteStatus>,
    pub feeds_ok: usize,
    pub feeds_failed: usize,
}

/// Fetch-and-dispatch hub over a set of GTFS-realtime feed URLs.
///
/// Entities subscribe stop and route IDs before the first poll; each poll
/// fully replaces the realtime state for every subscribed ID.
pub struct RealtimeHub<C> {
    feed_urls: Vec<String>,
    client: Arc<C>,
    concurrency: usize,
    stop_ids: HashSet<String>,
    route_ids: HashSet<String>,
}

impl<C: HttpClient + Send + Sync + 'static> RealtimeHub<C> {
    pub fn new(feed_urls: Vec<String>, client: C) -> Self {
        Self {
            feed_urls,
            client: Arc::new(client),
            concurrency: 4,
            stop_ids: HashSet::new(),
            route_ids: HashSet::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn subscribe_stop(&mut self, stop_id: impl Into<String>) {
        self.stop_ids.insert(stop_id.into());
    }

    pub fn subscribe_route(&mut self, route_id: impl Into<String>) {
        self.route_ids.insert(route_id.into());
    }

    pub fn feed_urls(&self) -> &[String] {
        &self.feed_urls
    }

    pub fn subscribed_stops(&self) -> usize {
        self.stop_ids.len()
    }

    pub fn subscribed_routes(&self) -> usize {
        self.route_ids.len()
    }

    /// Fetches every feed once and fails on the first unreachable or
    /// undecodable feed. Used to verify configuration before starting the
    /// polling loop.
    pub async fn verify(&self) -> Result<()> {
        for (url, fetched) in self.fetch_all().await {
            let bytes = fetched?;
            decode_feed(&bytes).with_context(|| format!("feed {url}"))?;
        }
        Ok(())
    }

    /// Polls every feed and merges the results for subscribed IDs.
    ///
    /// Individual feed failures are logged and counted but never fail the
    /// poll; the remaining feeds still contribute data.
    pub async fn poll(&self, now: DateTime<Utc>) -> RealtimeData {
        let mut data = RealtimeData::default();
        for stop_id in &self.stop_ids {
            data.station_stops
                .insert(stop_id.clone(), StationStop::new(stop_id.clone()));
        }
        for route_id in &self.route_ids {
            data.route_statuses
                .insert(route_id.clone(), RouteStatus::new(route_id.clone()));
        }

        for (url, fetched) in self.fetch_all().await {
            match fetched.and_then(|bytes| decode_feed(&bytes)) {
                Ok(feed) => {
                    debug!(url = %url, entities = feed.entity.len(), "Feed decoded");
                    self.merge_feed(&mut data, &feed, now);
                    data.feeds_ok += 1;
                }
                Err(e) => {
                    error!(url = %url, error = %e, "Feed poll failed");
                    data.feeds_failed += 1;
                }
            }
        }

        for stop in data.station_stops.values_mut() {
            stop.arrivals.sort_by_key(|arrival| arrival.time);
            stop.last_updated = Some(now);
        }
        for status in data.route_statuses.values_mut() {
            status.last_updated = Some(now);
        }
        data
    }

    async fn fetch_all(&self) -> Vec<(String, Result<bytes::Bytes>)> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(self.feed_urls.len());

        for url in &self.feed_urls {
            let sem = semaphore.clone();
            let client = self.client.clone();
            let url = url.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = sem.acquire().await;
                let fetched = fetch_bytes(client.as_ref(), &url).await;
                (url, fetched)
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "Feed fetch task panicked"),
            }
        }
        results
    }

    fn merge_feed(&self, data: &mut RealtimeData, feed: &FeedMessage, now: DateTime<Utc>) {
        for entity in &feed.entity {
            if entity.is_deleted() {
                continue;
            }

            if let Some(trip_update) = &entity.trip_update {
                let trip = &trip_update.trip;
                let route_id = trip.route_id.clone().unwrap_or_default();
                let trip_id = trip.trip_id.clone().unwrap_or_default();

                for stop_time in &trip_update.stop_time_update {
                    let Some(stop_id) = &stop_time.stop_id else {
                        continue;
                    };
                    let Some(stop) = data.station_stops.get_mut(stop_id) else {
                        continue;
                    };
                    if matches!(
                        stop_time.schedule_relationship(),
                        ScheduleRelationship::Skipped | ScheduleRelationship::NoData
                    ) {
                        continue;
                    }
                    let event_time = stop_time
                        .arrival
                        .as_ref()
                        .and_then(|event| event.time)
                        .or_else(|| stop_time.departure.as_ref().and_then(|event| event.time));
                    let Some(event_time) = event_time else {
                        continue;
                    };
                    let Some(time) = DateTime::from_timestamp(event_time, 0) else {
                        warn!(stop_id = %stop_id, event_time, "Arrival timestamp out of range");
                        continue;
                    };
                    stop.arrivals.push(Arrival {
                        route_id: route_id.clone(),
                        trip_id: trip_id.clone(),
                        time,
                    });
                }
            }

            if let Some(alert) = &entity.alert {
                if !alert_active_at(alert, now) {
                    continue;
                }
                let info = AlertInfo::from_alert(alert);
                for informed in &alert.informed_entity {
                    if let Some(route_id) = &informed.route_id {
                        if let Some(status) = data.route_statuses.get_mut(route_id) {
                            status.alerts.push(info.clone());
                        }
                    }
                    if let Some(stop_id) = &informed.stop_id {
                        if let Some(stop) = data.station_stops.get_mut(stop_id) {
                            stop.alerts.push(info.clone());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::translated_string::Translation;
    use crate::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
    use crate::gtfs_rt::{
        Alert, EntitySelector, FeedEntity, FeedHeader, TranslatedString, TripDescriptor, TripUpdate,
    };
    use async_trait::async_trait;

    // Feeds are injected directly through merge_feed in these tests; the
    // HTTP path is covered by the integration tests with a mock client.
    struct PanicClient;

    #[async_trait]
    impl HttpClient for PanicClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            unreachable!("tests never fetch");
        }
    }

    fn hub(stops: &[&str], routes: &[&str]) -> RealtimeHub<PanicClient> {
        let mut hub = RealtimeHub::new(vec![], PanicClient);
        for stop in stops {
            hub.subscribe_stop(*stop);
        }
        for route in routes {
            hub.subscribe_route(*route);
        }
        hub
    }

    fn feed(entities: Vec<FeedEntity>) -> FeedMessage {
        FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                incrementality: None,
                timestamp: Some(1_700_000_000),
                feed_version: None,
            },
            entity: entities,
        }
    }

    fn trip_update_entity(
        id: &str,
        route: &str,
        trip: &str,
        stops: &[(&str, i64)],
    ) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            trip_update: Some(TripUpdate {
                trip: TripDescriptor {
                    trip_id: Some(trip.to_string()),
                    route_id: Some(route.to_string()),
                    ..Default::default()
                },
                stop_time_update: stops
                    .iter()
                    .map(|(stop_id, time)| StopTimeUpdate {
                        stop_id: Some(stop_id.to_string()),
                        arrival: Some(StopTimeEvent {
                            time: Some(*time),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn alert_entity(id: &str, route: Option<&str>, stop: Option<&str>, header: &str) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            alert: Some(Alert {
                informed_entity: vec![EntitySelector {
                    route_id: route.map(str::to_string),
                    stop_id: stop.map(str::to_string),
                    ..Default::default()
                }],
                header_text: Some(TranslatedString {
                    translation: vec![Translation {
                        text: header.to_string(),
                        language: Some("en".to_string()),
                    }],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_decode_empty_bytes_is_default_feed() {
        // Empty bytes decode to an all-default message; valid protobuf.
        let feed = decode_feed(&[]).unwrap();
        assert_eq!(feed.header.gtfs_realtime_version, "");
        assert!(feed.entity.is_empty());
    }

    #[test]
    fn test_decode_invalid_bytes_fails() {
        assert!(decode_feed(&[0xFF, 0xFE, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_decode_round_trip() {
        let encoded = feed(vec![]).encode_to_vec();
        let decoded = decode_feed(&encoded).unwrap();
        assert_eq!(decoded.header.gtfs_realtime_version, "2.0");
    }

    #[test]
    fn test_merge_dispatches_arrivals_to_subscribed_stops() {
        let hub = hub(&["101N"], &[]);
        let mut data = RealtimeData::default();
        data.station_stops
            .insert("101N".to_string(), StationStop::new("101N"));

        let message = feed(vec![trip_update_entity(
            "1",
            "A",
            "trip-1",
            &[("101N", 1_700_000_300), ("999S", 1_700_000_400)],
        )]);
        hub.merge_feed(&mut data, &message, now());

        let stop = &data.station_stops["101N"];
        assert_eq!(stop.arrivals.len(), 1);
        assert_eq!(stop.arrivals[0].route_id, "A");
        assert_eq!(stop.arrivals[0].trip_id, "trip-1");
    }

    #[test]
    fn test_merge_skips_skipped_stop_times() {
        let hub = hub(&["101N"], &[]);
        let mut data = RealtimeData::default();
        data.station_stops
            .insert("101N".to_string(), StationStop::new("101N"));

        let mut entity = trip_update_entity("1", "A", "trip-1", &[("101N", 1_700_000_300)]);
        entity.trip_update.as_mut().unwrap().stop_time_update[0].schedule_relationship =
            Some(ScheduleRelationship::Skipped as i32);

        hub.merge_feed(&mut data, &feed(vec![entity]), now());
        assert!(data.station_stops["101N"].arrivals.is_empty());
    }

    #[test]
    fn test_merge_dispatches_alerts_to_routes_and_stops() {
        let hub = hub(&["101N"], &["A"]);
        let mut data = RealtimeData::default();
        data.station_stops
            .insert("101N".to_string(), StationStop::new("101N"));
        data.route_statuses
            .insert("A".to_string(), RouteStatus::new("A"));

        let message = feed(vec![
            alert_entity("a1", Some("A"), None, "Route delays"),
            alert_entity("a2", None, Some("101N"), "Stop closed"),
            alert_entity("a3", Some("ZZ"), None, "Other route"),
        ]);
        hub.merge_feed(&mut data, &message, now());

        assert_eq!(data.route_statuses["A"].alerts.len(), 1);
        assert_eq!(data.route_statuses["A"].alerts[0].header_for("en"), "Route delays");
        assert_eq!(data.station_stops["101N"].alerts.len(), 1);
    }

    #[test]
    fn test_merge_ignores_deleted_entities() {
        let hub = hub(&["101N"], &[]);
        let mut data = RealtimeData::default();
        data.station_stops
            .insert("101N".to_string(), StationStop::new("101N"));

        let mut entity = trip_update_entity("1", "A", "trip-1", &[("101N", 1_700_000_300)]);
        entity.is_deleted = Some(true);

        hub.merge_feed(&mut data, &feed(vec![entity]), now());
        assert!(data.station_stops["101N"].arrivals.is_empty());
    }
}
