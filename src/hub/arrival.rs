use chrono::{DateTime, Utc};

use super::alert::AlertInfo;

/// A single predicted arrival at a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub route_id: String,
    pub trip_id: String,
    pub time: DateTime<Utc>,
}

impl Arrival {
    /// Seconds from `now` until this arrival. Negative when the arrival is
    /// in the past but still present in the feed.
    pub fn seconds_until(&self, now: DateTime<Utc>) -> i64 {
        (self.time - now).num_seconds()
    }
}

/// Realtime state for a single subscribed stop.
#[derive(Debug, Clone, Default)]
pub struct StationStop {
    pub stop_id: String,
    /// Upcoming arrivals, sorted soonest first.
    pub arrivals: Vec<Arrival>,
    pub alerts: Vec<AlertInfo>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl StationStop {
    pub fn new(stop_id: impl Into<String>) -> Self {
        Self {
            stop_id: stop_id.into(),
            ..Default::default()
        }
    }
}
