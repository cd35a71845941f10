//! Board configuration: load, validate, and migrate.
//!
//! Stored as a plain JSON object on disk. Version 1 files (no per-source
//! static refresh frequencies) are migrated in place to version 2.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

pub const CONFIG_VERSION: u32 = 2;
pub const DEFAULT_STATIC_UPDATE_HOURS: u64 = 2;
pub const DEFAULT_ARRIVAL_LIMIT: usize = 4;
pub const DEFAULT_REALTIME_UPDATE_SECONDS: u64 = 60;

/// Error code reported when neither stops nor routes are selected.
pub const ERR_SELECT_AT_LEAST_ONE_STOP_OR_ROUTE: &str = "select_at_least_one_stop_or_route";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// API key sent with realtime feed requests. Goes into the `api_key`
    /// header unless `api_key_param` names a query parameter instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Query parameter name for providers that authenticate in the URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_param: Option<String>,

    /// GTFS-realtime protobuf feed URLs.
    pub url_endpoints: Vec<String>,

    /// GTFS static schedule sources: zip URLs, zip paths, or directories.
    #[serde(default)]
    pub gtfs_static_data: Vec<String>,

    /// Refresh frequency per static source, in hours.
    #[serde(default)]
    pub static_sources_update_frequency: HashMap<String, u64>,

    /// Routes to watch for service alerts.
    #[serde(default)]
    pub route_ids: Vec<String>,

    /// Stops to watch for arrivals and alerts.
    #[serde(default)]
    pub stop_ids: Vec<String>,

    /// Number of arrival sensors created per stop.
    #[serde(default = "default_arrival_limit")]
    pub arrival_limit: usize,

    /// Directory of per-route `.svg` icons used as entity pictures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_icons: Option<String>,

    /// Preferred language for alert text lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Realtime poll interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_update_seconds: Option<u64>,
}

fn default_version() -> u32 {
    // Files written before versioning predate the frequency map.
    1
}

fn default_arrival_limit() -> usize {
    DEFAULT_ARRIVAL_LIMIT
}

impl BoardConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: BoardConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }

    /// Migrates older config versions to [`CONFIG_VERSION`].
    ///
    /// Returns `true` if anything changed. Versions newer than this build
    /// are rejected.
    pub fn migrate(&mut self) -> Result<bool> {
        if self.version > CONFIG_VERSION {
            bail!(
                "config version {} is newer than supported version {}",
                self.version,
                CONFIG_VERSION
            );
        }
        if self.version == CONFIG_VERSION {
            return Ok(false);
        }
        debug!(
            from = self.version,
            to = CONFIG_VERSION,
            "Migrating configuration"
        );
        // v1 -> v2: every static source refreshes at the default frequency.
        for source in &self.gtfs_static_data {
            self.static_sources_update_frequency
                .entry(source.clone())
                .or_insert(DEFAULT_STATIC_UPDATE_HOURS);
            debug!(source = %source, hours = DEFAULT_STATIC_UPDATE_HOURS, "Static source frequency set");
        }
        self.version = CONFIG_VERSION;
        Ok(true)
    }

    /// Validates the configuration.
    ///
    /// The only mutation performed is coercing zero-hour static refresh
    /// frequencies back to the default, matching the migration semantics.
    pub fn validate(&mut self) -> Result<()> {
        if self.url_endpoints.is_empty() {
            bail!("at least one realtime feed URL endpoint is required");
        }
        for url in &self.url_endpoints {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("realtime feed endpoint is not an http(s) URL: {url}");
            }
        }
        for source in &self.gtfs_static_data {
            if source.trim().is_empty() {
                bail!("static schedule sources must not be blank");
            }
        }
        if self.stop_ids.is_empty() && self.route_ids.is_empty() {
            bail!("{ERR_SELECT_AT_LEAST_ONE_STOP_OR_ROUTE}");
        }
        if self.arrival_limit == 0 {
            bail!("arrival_limit must be at least 1");
        }
        for (source, hours) in self.static_sources_update_frequency.iter_mut() {
            // A zero here is almost always stray input; coerce to the default.
            if *hours == 0 {
                warn!(source = %source, "Static refresh frequency of 0h coerced to {}h", DEFAULT_STATIC_UPDATE_HOURS);
                *hours = DEFAULT_STATIC_UPDATE_HOURS;
            }
        }
        Ok(())
    }

    /// Refresh frequency for `source`, falling back to the default.
    pub fn static_update_frequency(&self, source: &str) -> chrono::Duration {
        let hours = self
            .static_sources_update_frequency
            .get(source)
            .copied()
            .unwrap_or(DEFAULT_STATIC_UPDATE_HOURS);
        chrono::Duration::hours(hours as i64)
    }

    pub fn realtime_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.realtime_update_seconds
                .unwrap_or(DEFAULT_REALTIME_UPDATE_SECONDS),
        )
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> BoardConfig {
        BoardConfig {
            version: CONFIG_VERSION,
            api_key: None,
            api_key_param: None,
            url_endpoints: vec!["https://gtfs.example.com/feed".to_string()],
            gtfs_static_data: vec!["https://gtfs.example.com/static.zip".to_string()],
            static_sources_update_frequency: HashMap::new(),
            route_ids: vec!["A".to_string()],
            stop_ids: vec![],
            arrival_limit: DEFAULT_ARRIVAL_LIMIT,
            route_icons: None,
            language: None,
            realtime_update_seconds: None,
        }
    }

    #[test]
    fn test_validate_minimal_ok() {
        let mut config = minimal();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_endpoint() {
        let mut config = minimal();
        config.url_endpoints.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        let mut config = minimal();
        config.url_endpoints = vec!["ftp://example.com/feed".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_stop_or_route() {
        let mut config = minimal();
        config.route_ids.clear();
        config.stop_ids.clear();
        let err = config.validate().unwrap_err();
        assert!(
            err.to_string()
                .contains(ERR_SELECT_AT_LEAST_ONE_STOP_OR_ROUTE)
        );
    }

    #[test]
    fn test_validate_coerces_zero_frequency() {
        let mut config = minimal();
        config
            .static_sources_update_frequency
            .insert("https://gtfs.example.com/static.zip".to_string(), 0);
        config.validate().unwrap();
        assert_eq!(
            config.static_sources_update_frequency["https://gtfs.example.com/static.zip"],
            DEFAULT_STATIC_UPDATE_HOURS
        );
    }

    #[test]
    fn test_migrate_v1_to_v2() {
        let mut config = minimal();
        config.version = 1;
        config.static_sources_update_frequency.clear();

        let changed = config.migrate().unwrap();

        assert!(changed);
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(
            config.static_sources_update_frequency["https://gtfs.example.com/static.zip"],
            DEFAULT_STATIC_UPDATE_HOURS
        );
    }

    #[test]
    fn test_migrate_current_version_noop() {
        let mut config = minimal();
        let changed = config.migrate().unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_migrate_rejects_future_version() {
        let mut config = minimal();
        config.version = CONFIG_VERSION + 1;
        assert!(config.migrate().is_err());
    }

    #[test]
    fn test_load_defaults_missing_version_to_v1() {
        let raw = r#"{"url_endpoints": ["https://gtfs.example.com/feed"]}"#;
        let config: BoardConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.arrival_limit, DEFAULT_ARRIVAL_LIMIT);
    }

    #[test]
    fn test_round_trip_json() {
        let config = minimal();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BoardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_static_update_frequency_fallback() {
        let config = minimal();
        assert_eq!(
            config.static_update_frequency("https://gtfs.example.com/static.zip"),
            chrono::Duration::hours(DEFAULT_STATIC_UPDATE_HOURS as i64)
        );
    }
}
