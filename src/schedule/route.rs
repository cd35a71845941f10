use std::collections::HashMap;

/// Route metadata from `routes.txt`. Colors are `#RRGGBB` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteInfo {
    pub route_id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: String,
    pub color: String,
    pub text_color: String,
}

impl RouteInfo {
    /// Display name: long name, else short name, else the ID.
    pub fn display_name(&self) -> &str {
        self.long_name
            .as_deref()
            .or(self.short_name.as_deref())
            .unwrap_or(&self.route_id)
    }
}

/// Lookup of route metadata by route ID.
#[derive(Debug, Clone, Default)]
pub struct RouteInfoDb {
    infos: HashMap<String, RouteInfo>,
}

impl RouteInfoDb {
    pub fn insert(&mut self, info: RouteInfo) {
        self.infos.insert(info.route_id.clone(), info);
    }

    pub fn get(&self, route_id: &str) -> Option<&RouteInfo> {
        self.infos.get(route_id)
    }

    pub fn contains(&self, route_id: &str) -> bool {
        self.infos.contains_key(route_id)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn merge(&mut self, other: RouteInfoDb) {
        self.infos.extend(other.infos);
    }
}
