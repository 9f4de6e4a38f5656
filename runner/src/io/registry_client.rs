//! HTTP client for the discovery registry.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use reqwest::blocking::Client;
use tracing::debug;

use crate::core::station::{ServiceTemplate, StationRef};
use crate::io::directory::{Directory, DiscoverySession, Registry};
use crate::io::http_station::{HttpStation, StationTimeouts};
use crate::io::protocol::{self, LookupQuery, LookupResponse, StationEntry};

/// Opens discovery sessions against a registry at a fixed URL.
///
/// Each session owns a fresh connection pool, shared with the station
/// clients it hands out.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    registry: Url,
    timeouts: StationTimeouts,
}

impl HttpDirectory {
    pub fn new(registry_url: &str, timeouts: StationTimeouts) -> Result<Self> {
        let registry = Url::parse(registry_url)
            .with_context(|| format!("parse registry url {registry_url}"))?;
        Ok(Self { registry, timeouts })
    }

    pub fn registry_url(&self) -> &Url {
        &self.registry
    }
}

impl Directory for HttpDirectory {
    fn open_session(&self) -> Result<DiscoverySession> {
        let client = Client::builder()
            .timeout(self.timeouts.call)
            .build()
            .context("build registry http client")?;
        Ok(DiscoverySession::new(Box::new(HttpRegistry {
            base: self.registry.clone(),
            client,
            timeouts: self.timeouts,
        })))
    }
}

struct HttpRegistry {
    base: Url,
    client: Client,
    timeouts: StationTimeouts,
}

impl HttpRegistry {
    fn lookup_url(&self) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("{} cannot be a base url", self.base))?
            .pop_if_empty()
            .extend(protocol::REGISTRY_LOOKUP);
        Ok(url)
    }

    fn station_for(&self, entry: &StationEntry) -> Option<StationRef> {
        match Url::parse(&entry.url) {
            Ok(url) => Some(Arc::new(HttpStation::new(
                url,
                self.client.clone(),
                self.timeouts,
            ))),
            Err(err) => {
                debug!(station = %entry.id, url = %entry.url, error = %err, "skipping registration with invalid url");
                None
            }
        }
    }
}

impl Registry for HttpRegistry {
    fn lookup(&self, template: &ServiceTemplate, max_results: usize) -> Result<Vec<StationRef>> {
        let query = LookupQuery {
            service_type: template.service_type.clone(),
            max_results,
        };
        let response = self
            .client
            .get(self.lookup_url()?)
            .query(&query)
            .timeout(self.timeouts.probe)
            .send()
            .context("query registry")?
            .error_for_status()
            .context("registry lookup status")?;
        let body: LookupResponse = response.json().context("decode registry lookup")?;
        Ok(body
            .stations
            .iter()
            .filter_map(|entry| self.station_for(entry))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_url_appends_registry_path() {
        let directory =
            HttpDirectory::new("http://127.0.0.1:4000", StationTimeouts::default()).expect("url");
        let registry = HttpRegistry {
            base: directory.registry_url().clone(),
            client: Client::new(),
            timeouts: StationTimeouts::default(),
        };
        assert_eq!(
            registry.lookup_url().expect("lookup url").as_str(),
            "http://127.0.0.1:4000/registry/lookup"
        );
    }

    #[test]
    fn invalid_station_urls_are_skipped() {
        let registry = HttpRegistry {
            base: Url::parse("http://127.0.0.1:4000").expect("url"),
            client: Client::new(),
            timeouts: StationTimeouts::default(),
        };
        let entry = StationEntry {
            id: "broken".to_string(),
            url: "::not-a-url".to_string(),
        };
        assert!(registry.station_for(&entry).is_none());
    }

    #[test]
    fn rejects_invalid_registry_url() {
        assert!(HttpDirectory::new("registry", StationTimeouts::default()).is_err());
    }
}
