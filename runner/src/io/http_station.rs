//! Station contract client over HTTP.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::core::command::MigrationCommand;
use crate::core::station::{Station, StationError};
use crate::io::protocol::{self, ItResponse, OccupantsResponse, PropertyResponse, TagResponse};

/// Per-call timeouts for station requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationTimeouts {
    /// Liveness probe and property lookups.
    pub probe: Duration,
    /// Every other contract call, including the handoff itself.
    pub call: Duration,
}

impl Default for StationTimeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(2),
            call: Duration::from_secs(10),
        }
    }
}

/// HTTP-backed [`Station`].
#[derive(Clone)]
pub struct HttpStation {
    base: Url,
    client: Client,
    timeouts: StationTimeouts,
}

impl std::fmt::Debug for HttpStation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStation")
            .field("base", &self.base.as_str())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl HttpStation {
    /// Wrap an existing client; used when many stations share one connection pool.
    pub fn new(base: Url, client: Client, timeouts: StationTimeouts) -> Self {
        Self {
            base,
            client,
            timeouts,
        }
    }

    /// Build a station client for a single URL.
    pub fn connect(url: &str, timeouts: StationTimeouts) -> Result<Self, StationError> {
        let base = Url::parse(url)
            .map_err(|e| StationError::Protocol(format!("invalid station url {url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeouts.call)
            .build()
            .map_err(|e| StationError::Unreachable(format!("build http client: {e}")))?;
        Ok(Self::new(base, client, timeouts))
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StationError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                StationError::Protocol(format!("{} cannot be a base url", self.base))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn occupant_url(&self, occupant_id: &str, action: &str) -> Result<Url, StationError> {
        let mut segments = protocol::OCCUPANTS.to_vec();
        segments.push(occupant_id);
        segments.push(action);
        self.url(&segments)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, StationError> {
        let response = request
            .send()
            .map_err(|e| StationError::Unreachable(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(classify_status(status, body))
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StationError> {
        self.send(request)?
            .json()
            .map_err(|e| StationError::Protocol(format!("decode response: {e}")))
    }
}

/// Map a non-success HTTP status to the station error taxonomy.
fn classify_status(status: StatusCode, body: String) -> StationError {
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        let reason = if body.trim().is_empty() {
            status.to_string()
        } else {
            body
        };
        return StationError::EntryPointRejected(reason);
    }
    if status.is_server_error() {
        return StationError::Unreachable(format!("HTTP {status}"));
    }
    StationError::Protocol(format!("HTTP {status}: {body}"))
}

impl Station for HttpStation {
    fn ping(&self) -> Result<(), StationError> {
        let url = self.url(protocol::PING)?;
        let body = self
            .send(self.client.get(url).timeout(self.timeouts.probe))?
            .text()
            .map_err(|e| StationError::Unreachable(e.to_string()))?;
        if body.trim() != protocol::PONG {
            return Err(StationError::Protocol(format!("unexpected ping reply {body:?}")));
        }
        Ok(())
    }

    fn property(&self, key: &str) -> Result<Option<String>, StationError> {
        let mut segments = protocol::PROPERTIES.to_vec();
        segments.push(key);
        let url = self.url(&segments)?;
        let response: PropertyResponse =
            self.fetch(self.client.get(url).timeout(self.timeouts.probe))?;
        Ok(response.value)
    }

    #[instrument(skip_all, fields(station = %self.base, entry_point = command.entry_point.name()))]
    fn accept(&self, command: &MigrationCommand) -> Result<(), StationError> {
        let url = self.url(protocol::ACCEPT)?;
        self.send(
            self.client
                .post(url)
                .timeout(self.timeouts.call)
                .json(command),
        )?;
        debug!("handoff accepted");
        Ok(())
    }

    fn attempt_tag(&self, occupant_id: &str) -> Result<bool, StationError> {
        let url = self.occupant_url(occupant_id, "tag")?;
        let response: TagResponse =
            self.fetch(self.client.post(url).timeout(self.timeouts.call))?;
        Ok(response.tagged)
    }

    fn is_occupant_it(&self, occupant_id: &str) -> Result<bool, StationError> {
        let url = self.occupant_url(occupant_id, "it")?;
        let response: ItResponse = self.fetch(self.client.get(url).timeout(self.timeouts.call))?;
        Ok(response.it)
    }

    fn occupant_ids(&self) -> Result<Vec<String>, StationError> {
        let url = self.url(protocol::OCCUPANTS)?;
        let response: OccupantsResponse =
            self.fetch(self.client.get(url).timeout(self.timeouts.call))?;
        Ok(response.ids)
    }

    fn endpoint(&self) -> String {
        self.base.to_string()
    }
}
