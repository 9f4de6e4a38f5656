//! Liveness prober.
//!
//! Registry entries lag real liveness: a station can crash without
//! deregistering. Every candidate is pinged and asked for its identity;
//! anything that errors or has no `id` property is dropped silently and may
//! reappear in a later discovery cycle.

use tracing::debug;

use crate::core::station::{ID_PROPERTY, LiveStation, StationRef};

/// Keep the candidates that answer `ping` and report an identity.
///
/// The result is always a subset of `candidates`.
pub fn probe(candidates: Vec<StationRef>) -> Vec<LiveStation> {
    let total = candidates.len();
    let live: Vec<LiveStation> = candidates.into_iter().filter_map(probe_one).collect();
    debug!(candidates = total, live = live.len(), "probed stations");
    live
}

fn probe_one(station: StationRef) -> Option<LiveStation> {
    if let Err(err) = station.ping() {
        debug!(endpoint = %station.endpoint(), error = %err, "station did not answer ping");
        return None;
    }
    match station.property(ID_PROPERTY) {
        Ok(Some(id)) => Some(LiveStation::new(id, station)),
        Ok(None) => {
            debug!(endpoint = %station.endpoint(), "station has no id property");
            None
        }
        Err(err) => {
            debug!(endpoint = %station.endpoint(), error = %err, "station id lookup failed");
            None
        }
    }
}
