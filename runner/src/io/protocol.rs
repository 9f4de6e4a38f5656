//! HTTP wire format shared by runners, station hosts, and the registry.
//!
//! Paths are expressed as segment lists so clients can percent-encode
//! occupant ids and property keys safely.

use serde::{Deserialize, Serialize};

pub const STATION_PREFIX: &str = "station";
pub const REGISTRY_PREFIX: &str = "registry";

pub const PING: &[&str] = &[STATION_PREFIX, "ping"];
pub const ACCEPT: &[&str] = &[STATION_PREFIX, "accept"];
pub const OCCUPANTS: &[&str] = &[STATION_PREFIX, "occupants"];
pub const PROPERTIES: &[&str] = &[STATION_PREFIX, "properties"];

pub const REGISTRY_STATIONS: &[&str] = &[REGISTRY_PREFIX, "stations"];
pub const REGISTRY_LOOKUP: &[&str] = &[REGISTRY_PREFIX, "lookup"];

/// Body returned by `ping`.
pub const PONG: &str = "pong";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyResponse {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResponse {
    pub tagged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItResponse {
    pub it: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupantsResponse {
    pub ids: Vec<String>,
}

/// Station registration (and lease renewal) sent to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub url: String,
    pub service_type: String,
    pub lease_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupQuery {
    pub service_type: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationEntry {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub stations: Vec<StationEntry>,
}

/// Route pattern for axum, e.g. `/station/occupants/{id}/tag`.
pub fn route(segments: &[&str]) -> String {
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_joins_segments() {
        assert_eq!(route(PING), "/station/ping");
        assert_eq!(
            route(&[STATION_PREFIX, "occupants", "{id}", "tag"]),
            "/station/occupants/{id}/tag"
        );
    }
}
