//! Station contract consumed by every runner.
//!
//! A station is a host process that accepts mobile runners and exposes the
//! roster of runners currently co-located with it. Runners never own a
//! station: they hold transient references obtained from discovery, plus a
//! weak back-reference to the station they currently occupy.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::command::MigrationCommand;

/// Property key every station must answer with its unique identity.
pub const ID_PROPERTY: &str = "id";

/// Service type advertised by stations in the discovery registry.
pub const STATION_SERVICE_TYPE: &str = "tag.station.v1";

/// Errors surfaced by a station contract call.
#[derive(Debug, Error)]
pub enum StationError {
    /// Transport-level failure: timeout, refused connection, stale registration.
    #[error("station unreachable: {0}")]
    Unreachable(String),

    /// The station could not resolve the requested entry point against the unit.
    #[error("entry point rejected: {0}")]
    EntryPointRejected(String),

    /// The peer answered, but not according to the station contract.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Remote contract implemented by every station host.
pub trait Station: Send + Sync {
    /// Cheap health check.
    fn ping(&self) -> Result<(), StationError>;

    /// Case-insensitive property lookup. `Ok(None)` when the key is unknown.
    fn property(&self, key: &str) -> Result<Option<String>, StationError>;

    /// Hand a mobile unit to the station and ask it to run the named entry point.
    fn accept(&self, command: &MigrationCommand) -> Result<(), StationError>;

    /// Atomically flip the occupant's IT flag. Returns `true` only for the call
    /// that performed the flip.
    fn attempt_tag(&self, occupant_id: &str) -> Result<bool, StationError>;

    /// Whether the occupant currently holds the IT mark. Unknown ids are not IT.
    fn is_occupant_it(&self, occupant_id: &str) -> Result<bool, StationError>;

    /// Occupant ids in arrival order.
    fn occupant_ids(&self) -> Result<Vec<String>, StationError>;

    /// Address used in diagnostics.
    fn endpoint(&self) -> String;
}

/// Shared handle to a station.
pub type StationRef = Arc<dyn Station>;

/// Discovery query descriptor, built once per runner and carried across jumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTemplate {
    pub service_type: String,
}

impl Default for ServiceTemplate {
    fn default() -> Self {
        Self {
            service_type: STATION_SERVICE_TYPE.to_string(),
        }
    }
}

/// A station that answered the liveness probe, with its resolved identity.
#[derive(Clone)]
pub struct LiveStation {
    pub id: String,
    pub station: StationRef,
}

impl LiveStation {
    pub fn new(id: impl Into<String>, station: StationRef) -> Self {
        Self {
            id: id.into(),
            station,
        }
    }
}

impl fmt::Debug for LiveStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStation")
            .field("id", &self.id)
            .field("endpoint", &self.station.endpoint())
            .finish()
    }
}
