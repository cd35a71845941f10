use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};

/// Weekly service pattern from `calendar.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub service_id: String,
    /// Monday through Sunday.
    pub weekdays: [bool; 7],
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Service {
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        if date < self.start || date > self.end {
            return false;
        }
        self.weekdays[date.weekday().num_days_from_monday() as usize]
    }
}

/// Service calendar: weekly patterns plus per-date exceptions from
/// `calendar_dates.txt`.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    pub services: HashMap<String, Service>,
    added: HashMap<String, HashSet<NaiveDate>>,
    removed: HashMap<String, HashSet<NaiveDate>>,
}

impl Calendar {
    pub fn insert_service(&mut self, service: Service) {
        self.services.insert(service.service_id.clone(), service);
    }

    pub fn add_exception(&mut self, service_id: &str, date: NaiveDate) {
        self.added
            .entry(service_id.to_string())
            .or_default()
            .insert(date);
    }

    pub fn remove_exception(&mut self, service_id: &str, date: NaiveDate) {
        self.removed
            .entry(service_id.to_string())
            .or_default()
            .insert(date);
    }

    /// Whether `service_id` is active on `date`. Removal exceptions win over
    /// additions; a service with no calendar entry and no addition for the
    /// date is inactive.
    pub fn is_active_on(&self, service_id: &str, date: NaiveDate) -> bool {
        if self
            .removed
            .get(service_id)
            .is_some_and(|dates| dates.contains(&date))
        {
            return false;
        }
        if self
            .added
            .get(service_id)
            .is_some_and(|dates| dates.contains(&date))
        {
            return true;
        }
        self.services
            .get(service_id)
            .is_some_and(|service| service.runs_on(date))
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    pub fn merge(&mut self, other: Calendar) {
        self.services.extend(other.services);
        for (service_id, dates) in other.added {
            self.added.entry(service_id).or_default().extend(dates);
        }
        for (service_id, dates) in other.removed {
            self.removed.entry(service_id).or_default().extend(dates);
        }
    }
}
