use anyhow::Result;

use super::Entity;
use crate::coordinator::CoordinatorHandle;

/// Button that reloads static data: one source when scoped, otherwise every
/// pending/stale source.
pub struct RefreshStaticButton {
    source: Option<String>,
    handle: CoordinatorHandle,
}

impl RefreshStaticButton {
    pub fn new(source: Option<String>, handle: CoordinatorHandle) -> Self {
        Self { source, handle }
    }

    pub async fn press(&self) -> Result<()> {
        self.handle.refresh_static(self.source.clone(), false).await
    }
}

impl Entity for RefreshStaticButton {
    fn unique_id(&self) -> String {
        match &self.source {
            Some(source) => format!("refresh_static_{source}"),
            None => "refresh_static".to_string(),
        }
    }

    fn name(&self) -> String {
        match &self.source {
            Some(source) => format!("Refresh Static Data: {source}"),
            None => "Refresh Static Data".to_string(),
        }
    }
}

/// Button that drops the cached schedule and rebuilds it from every source.
pub struct ClearStaticButton {
    handle: CoordinatorHandle,
}

impl ClearStaticButton {
    pub fn new(handle: CoordinatorHandle) -> Self {
        Self { handle }
    }

    pub async fn press(&self) -> Result<()> {
        self.handle.refresh_static(None, true).await
    }
}

impl Entity for ClearStaticButton {
    fn unique_id(&self) -> String {
        "clear_static_data".to_string()
    }

    fn name(&self) -> String {
        "Clear and Reload Static Data".to_string()
    }
}
