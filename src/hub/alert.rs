use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::gtfs_rt;

/// Translated alert text, keyed by language code. Translations without a
/// language land under the empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertInfo {
    pub header_text: HashMap<String, String>,
    pub description_text: HashMap<String, String>,
}

impl AlertInfo {
    pub fn from_alert(alert: &gtfs_rt::Alert) -> Self {
        Self {
            header_text: translation_map(alert.header_text.as_ref()),
            description_text: translation_map(alert.description_text.as_ref()),
        }
    }

    /// Header text for `language`, falling back to the unspecified-language
    /// translation, then to any translation at all.
    pub fn header_for(&self, language: &str) -> &str {
        lookup(&self.header_text, language)
    }

    pub fn description_for(&self, language: &str) -> &str {
        lookup(&self.description_text, language)
    }
}

fn translation_map(text: Option<&gtfs_rt::TranslatedString>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(text) = text {
        for translation in &text.translation {
            map.insert(
                translation.language.clone().unwrap_or_default(),
                translation.text.clone(),
            );
        }
    }
    map
}

fn lookup<'a>(map: &'a HashMap<String, String>, language: &str) -> &'a str {
    if let Some(text) = map.get(language) {
        return text;
    }
    if let Some(text) = map.get("") {
        return text;
    }
    // Deterministic fallback when the feed only carries other languages.
    map.iter()
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(_, text)| text.as_str())
        .unwrap_or("")
}

/// Returns whether the alert is in effect at `now`. Alerts with no active
/// periods are always in effect.
pub fn alert_active_at(alert: &gtfs_rt::Alert, now: DateTime<Utc>) -> bool {
    if alert.active_period.is_empty() {
        return true;
    }
    let now = now.timestamp();
    alert.active_period.iter().any(|period| {
        let started = period.start.map(|s| s as i64 <= now).unwrap_or(true);
        let not_ended = period.end.map(|e| now <= e as i64).unwrap_or(true);
        started && not_ended
    })
}

/// Realtime alert state for a single subscribed route.
#[derive(Debug, Clone, Default)]
pub struct RouteStatus {
    pub route_id: String,
    pub alerts: Vec<AlertInfo>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RouteStatus {
    pub fn new(route_id: impl Into<String>) -> Self {
        Self {
            route_id: route_id.into(),
            ..Default::default()
        }
    }
}
