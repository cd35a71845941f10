use std::collections::HashMap;

use chrono::NaiveDate;

use super::calendar::Calendar;

/// Trip metadata from `trips.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripInfo {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    pub headsign: Option<String>,
}

/// Lookup of trip metadata by trip ID, with fuzzy matching for realtime
/// feeds that carry truncated IDs.
#[derive(Debug, Clone, Default)]
pub struct TripInfoDb {
    infos: HashMap<String, TripInfo>,
}

impl TripInfoDb {
    pub fn insert(&mut self, info: TripInfo) {
        self.infos.insert(info.trip_id.clone(), info);
    }

    pub fn get(&self, trip_id: &str) -> Option<&TripInfo> {
        self.infos.get(trip_id)
    }

    /// Resolves a realtime trip ID against the static schedule.
    ///
    /// Realtime feeds (NYC subway among them) often publish trip IDs with
    /// the schedule-revision prefix stripped, so after an exact match this
    /// falls back to trips whose static ID ends with the realtime ID.
    /// Suffix candidates whose service is active on `date` win; ties break
    /// on the lexicographically smallest static trip ID.
    pub fn get_close_match(
        &self,
        realtime_trip_id: &str,
        calendar: &Calendar,
        date: NaiveDate,
    ) -> Option<&TripInfo> {
        if realtime_trip_id.is_empty() {
            return None;
        }
        if let Some(info) = self.infos.get(realtime_trip_id) {
            return Some(info);
        }

        let mut candidates: Vec<&TripInfo> = self
            .infos
            .values()
            .filter(|info| info.trip_id.ends_with(realtime_trip_id))
            .collect();
        candidates.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));

        candidates
            .iter()
            .find(|info| calendar.is_active_on(&info.service_id, date))
            .or_else(|| candidates.first())
            .copied()
    }

    pub fn route_ids(&self) -> impl Iterator<Item = &str> {
        self.infos.values().map(|info| info.route_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn merge(&mut self, other: TripInfoDb) {
        self.infos.extend(other.infos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::calendar::Service;

    fn trip(trip_id: &str, service_id: &str) -> TripInfo {
        TripInfo {
            trip_id: trip_id.to_string(),
            route_id: "1".to_string(),
            service_id: service_id.to_string(),
            headsign: Some("South Ferry".to_string()),
        }
    }

    fn all_week_calendar(service_ids: &[&str]) -> Calendar {
        let mut calendar = Calendar::default();
        for service_id in service_ids {
            calendar.insert_service(Service {
                service_id: service_id.to_string(),
                weekdays: [true; 7],
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            });
        }
        calendar
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 2).unwrap()
    }

    #[test]
    fn test_exact_match_wins() {
        let mut db = TripInfoDb::default();
        db.insert(trip("123456_1..S03R", "WKD"));

        let found = db
            .get_close_match("123456_1..S03R", &all_week_calendar(&["WKD"]), date())
            .unwrap();
        assert_eq!(found.trip_id, "123456_1..S03R");
    }

    #[test]
    fn test_suffix_match() {
        let mut db = TripInfoDb::default();
        db.insert(trip("AFA24GEN-1038-Weekday-00_123456_1..S03R", "WKD"));

        let found = db
            .get_close_match("123456_1..S03R", &all_week_calendar(&["WKD"]), date())
            .unwrap();
        assert_eq!(found.trip_id, "AFA24GEN-1038-Weekday-00_123456_1..S03R");
    }

    #[test]
    fn test_active_service_preferred() {
        let mut db = TripInfoDb::default();
        db.insert(trip("AAA-Sunday-00_123456_1..S03R", "SUN"));
        db.insert(trip("BBB-Weekday-00_123456_1..S03R", "WKD"));

        // Only the weekday service is active on the queried Monday.
        let found = db
            .get_close_match("123456_1..S03R", &all_week_calendar(&["WKD"]), date())
            .unwrap();
        assert_eq!(found.service_id, "WKD");
    }

    #[test]
    fn test_falls_back_when_no_active_service() {
        let mut db = TripInfoDb::default();
        db.insert(trip("BBB-Weekday-00_123456_1..S03R", "WKD"));

        let found = db
            .get_close_match("123456_1..S03R", &Calendar::default(), date())
            .unwrap();
        assert_eq!(found.service_id, "WKD");
    }

    #[test]
    fn test_no_match() {
        let mut db = TripInfoDb::default();
        db.insert(trip("AAA_1..S03R", "WKD"));

        assert!(
            db.get_close_match("zzz", &all_week_calendar(&["WKD"]), date())
                .is_none()
        );
        assert!(
            db.get_close_match("", &all_week_calendar(&["WKD"]), date())
                .is_none()
        );
    }
}
