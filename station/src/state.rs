//! Shared application state for the station host server.

use std::sync::Arc;

use crate::host::StationHost;

/// Shared state accessible from all station request handlers.
#[derive(Clone)]
pub struct AppState {
    pub host: Arc<StationHost>,
}

impl AppState {
    pub fn new(host: Arc<StationHost>) -> Self {
        Self { host }
    }
}
