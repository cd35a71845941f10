use std::collections::HashMap;

/// Stop metadata from `stops.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationStopInfo {
    pub id: String,
    pub name: Option<String>,
    pub parent_station: Option<String>,
}

/// Lookup of stop metadata by stop ID.
#[derive(Debug, Clone, Default)]
pub struct StationStopInfoDb {
    infos: HashMap<String, StationStopInfo>,
}

impl StationStopInfoDb {
    pub fn insert(&mut self, info: StationStopInfo) {
        self.infos.insert(info.id.clone(), info);
    }

    pub fn get(&self, stop_id: &str) -> Option<&StationStopInfo> {
        self.infos.get(stop_id)
    }

    /// Display name for a stop: the static name when known, else the ID.
    pub fn name_or_id(&self, stop_id: &str) -> String {
        self.infos
            .get(stop_id)
            .and_then(|info| info.name.clone())
            .unwrap_or_else(|| stop_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn merge(&mut self, other: StationStopInfoDb) {
        self.infos.extend(other.infos);
    }
}
