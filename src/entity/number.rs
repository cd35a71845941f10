use anyhow::Result;

use super::Entity;
use crate::coordinator::CoordinatorHandle;

/// Control entity exposing the refresh interval of one static source, in
/// hours. Changes are forwarded to the running coordinator.
pub struct StaticIntervalNumber {
    source: String,
    hours: u64,
    handle: CoordinatorHandle,
}

impl StaticIntervalNumber {
    pub fn new(source: String, hours: u64, handle: CoordinatorHandle) -> Self {
        Self {
            source,
            hours,
            handle,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn value(&self) -> u64 {
        self.hours
    }

    pub fn min_value(&self) -> u64 {
        1
    }

    /// Sets the refresh interval. Values below one hour are raised to it,
    /// mirroring the config-level coercion of zero frequencies.
    pub async fn set_value(&mut self, hours: u64) -> Result<()> {
        let hours = hours.max(self.min_value());
        self.handle
            .set_static_interval(self.source.clone(), hours)
            .await?;
        self.hours = hours;
        Ok(())
    }
}

impl Entity for StaticIntervalNumber {
    fn unique_id(&self) -> String {
        format!("static_update_frequency_{}", self.source)
    }

    fn name(&self) -> String {
        format!("Static Refresh Hours: {}", self.source)
    }
}
