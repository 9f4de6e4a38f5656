//! Side-effecting adapters: HTTP clients, discovery, probing, sleeping, config.

pub mod config;
pub mod directory;
pub mod http_station;
pub mod prober;
pub mod protocol;
pub mod registry_client;
pub mod sleeper;
