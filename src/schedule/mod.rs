//! Static GTFS schedule cache.
//!
//! Sources (zip URLs, zip files, or unpacked directories) are parsed by the
//! `gtfs_structures` crate and converted into small lookup databases; the
//! parsed form from later sources extends and overwrites earlier ones, so a
//! supplemented schedule can be layered over the regular one.

pub mod calendar;
pub mod route;
pub mod station;
pub mod trip;

pub use calendar::{Calendar, Service};
pub use route::{RouteInfo, RouteInfoDb};
pub use station::{StationStopInfo, StationStopInfoDb};
pub use trip::{TripInfo, TripInfoDb};

use anyhow::{Context, Result};
use gtfs_structures::Gtfs;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct GtfsSchedule {
    pub stops: StationStopInfoDb,
    pub trips: TripInfoDb,
    pub routes: RouteInfoDb,
    pub calendar: Calendar,
}

impl GtfsSchedule {
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
            && self.trips.is_empty()
            && self.routes.is_empty()
            && self.calendar.is_empty()
    }

    pub fn merge(&mut self, other: GtfsSchedule) {
        self.stops.merge(other.stops);
        self.trips.merge(other.trips);
        self.routes.merge(other.routes);
        self.calendar.merge(other.calendar);
    }

    /// Loads a single source. URLs are fetched, anything else is treated as
    /// a local zip or directory. Parsing runs on the blocking pool.
    pub async fn load_source(source: &str) -> Result<GtfsSchedule> {
        let target = source.to_string();
        let gtfs = tokio::task::spawn_blocking(move || {
            if target.starts_with("http://") || target.starts_with("https://") {
                Gtfs::from_url(&target)
            } else {
                Gtfs::from_path(&target)
            }
        })
        .await
        .context("schedule load task failed")?
        .with_context(|| format!("parsing GTFS static source {source}"))?;

        let schedule = GtfsSchedule::from_gtfs(&gtfs);
        info!(
            source = %source,
            stops = schedule.stops.len(),
            trips = schedule.trips.len(),
            routes = schedule.routes.len(),
            "GTFS static source loaded"
        );
        Ok(schedule)
    }

    /// Loads and merges all `sources` in order. Fails on the first source
    /// that cannot be loaded.
    pub async fn build<S: AsRef<str>>(sources: &[S]) -> Result<GtfsSchedule> {
        let mut schedule = GtfsSchedule::default();
        for source in sources {
            schedule.merge(Self::load_source(source.as_ref()).await?);
        }
        Ok(schedule)
    }

    pub fn from_gtfs(gtfs: &Gtfs) -> GtfsSchedule {
        let mut schedule = GtfsSchedule::default();

        for (stop_id, stop) in &gtfs.stops {
            schedule.stops.insert(StationStopInfo {
                id: stop_id.clone(),
                name: stop.name.clone(),
                parent_station: stop.parent_station.clone(),
            });
        }

        for (route_id, route) in &gtfs.routes {
            schedule.routes.insert(RouteInfo {
                route_id: route_id.clone(),
                short_name: route.short_name.clone(),
                long_name: route.long_name.clone(),
                route_type: format!("{:?}", route.route_type),
                color: hex_color(route.color.r, route.color.g, route.color.b),
                text_color: hex_color(route.text_color.r, route.text_color.g, route.text_color.b),
            });
        }

        for (trip_id, gtfs_trip) in &gtfs.trips {
            schedule.trips.insert(TripInfo {
                trip_id: trip_id.clone(),
                route_id: gtfs_trip.route_id.clone(),
                service_id: gtfs_trip.service_id.clone(),
                headsign: gtfs_trip.trip_headsign.clone(),
            });
        }

        for (service_id, service) in &gtfs.calendar {
            schedule.calendar.insert_service(Service {
                service_id: service_id.clone(),
                weekdays: [
                    service.monday,
                    service.tuesday,
                    service.wednesday,
                    service.thursday,
                    service.friday,
                    service.saturday,
                    service.sunday,
                ],
                start: service.start_date,
                end: service.end_date,
            });
        }
        for dates in gtfs.calendar_dates.values() {
            for calendar_date in dates {
                match calendar_date.exception_type {
                    gtfs_structures::Exception::Added => schedule
                        .calendar
                        .add_exception(&calendar_date.service_id, calendar_date.date),
                    gtfs_structures::Exception::Deleted => schedule
                        .calendar
                        .remove_exception(&calendar_date.service_id, calendar_date.date),
                }
            }
        }

        debug!(
            stops = schedule.stops.len(),
            trips = schedule.trips.len(),
            routes = schedule.routes.len(),
            "Converted GTFS dataset"
        );
        schedule
    }
}

fn hex_color(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}
