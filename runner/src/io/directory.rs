//! Station directory client.
//!
//! A [`DiscoverySession`] is the runner's handle on the discovery registry.
//! It is opened at the start of every arrival cycle, released once a
//! migration is accepted, and never travels with the runner.

use std::fmt;

use anyhow::Result;
use tracing::{debug, warn};

use crate::core::state::Runner;
use crate::core::station::{ServiceTemplate, StationRef};
use crate::io::sleeper::Sleeper;

/// Discovery registry query interface.
pub trait Registry: Send + Sync {
    /// Up to `max_results` stations registered under `template`. An empty
    /// result is legitimate.
    fn lookup(&self, template: &ServiceTemplate, max_results: usize) -> Result<Vec<StationRef>>;
}

/// Source of discovery sessions, owned by whoever hosts the runner.
pub trait Directory: Send + Sync {
    fn open_session(&self) -> Result<DiscoverySession>;
}

/// Scoped discovery handle.
pub struct DiscoverySession {
    registry: Option<Box<dyn Registry>>,
}

impl fmt::Debug for DiscoverySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoverySession")
            .field("released", &self.is_released())
            .finish()
    }
}

impl DiscoverySession {
    pub fn new(registry: Box<dyn Registry>) -> Self {
        debug!("discovery session opened");
        Self {
            registry: Some(registry),
        }
    }

    /// Single fail-soft query: registry errors yield an empty set.
    pub fn lookup(&self, template: &ServiceTemplate, max_results: usize) -> Vec<StationRef> {
        let Some(registry) = &self.registry else {
            warn!("lookup on a released discovery session");
            return Vec::new();
        };
        match registry.lookup(template, max_results) {
            Ok(stations) => stations,
            Err(err) => {
                debug!(error = %err, "registry lookup failed");
                Vec::new()
            }
        }
    }

    /// Drop the underlying registry connection.
    pub fn release(&mut self) {
        if self.registry.take().is_some() {
            debug!("discovery session released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.registry.is_none()
    }
}

/// Query the registry until at least one station is registered, sleeping
/// the runner's retry delay between empty answers. Never gives up.
pub fn discover_stations(
    session: &DiscoverySession,
    runner: &Runner,
    sleeper: &dyn Sleeper,
) -> Vec<StationRef> {
    let settings = runner.settings();
    loop {
        let stations = session.lookup(runner.template(), settings.max_results());
        if !stations.is_empty() {
            return stations;
        }
        runner.trace("no stations found, sleeping");
        sleeper.sleep(settings.retry_delay());
    }
}
