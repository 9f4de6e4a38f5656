//! Discovery registry: stations register under a lease, runners look them up.
//!
//! Registrations live only in memory. A station that stops renewing simply
//! drops out of lookups once its lease runs out.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use tracing::{debug, info};

use tag_runner::io::protocol::{
    self, LookupQuery, LookupResponse, Registration, StationEntry, route,
};

/// Shortest lease the registry grants.
pub const MIN_LEASE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    url: String,
    service_type: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct Registrations {
    entries: Vec<Entry>,
}

impl Registrations {
    /// Register or renew. Renewal keeps the station's original position.
    pub fn register(&mut self, registration: Registration, now: Instant) {
        let lease = Duration::from_secs(registration.lease_secs).max(MIN_LEASE);
        let expires_at = now + lease;
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.id == registration.id)
        {
            Some(entry) => {
                entry.url = registration.url;
                entry.service_type = registration.service_type;
                entry.expires_at = expires_at;
            }
            None => self.entries.push(Entry {
                id: registration.id,
                url: registration.url,
                service_type: registration.service_type,
                expires_at,
            }),
        }
    }

    pub fn deregister(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Unexpired stations of `service_type`, oldest registration first.
    pub fn lookup(
        &mut self,
        service_type: &str,
        max_results: usize,
        now: Instant,
    ) -> Vec<StationEntry> {
        self.entries.retain(|entry| entry.expires_at > now);
        self.entries
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .take(max_results)
            .map(|entry| StationEntry {
                id: entry.id.clone(),
                url: entry.url.clone(),
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct RegistryState {
    registrations: Arc<Mutex<Registrations>>,
}

impl RegistryState {
    fn registrations(&self) -> MutexGuard<'_, Registrations> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn registry_router() -> Router<RegistryState> {
    Router::new()
        .route(&route(protocol::REGISTRY_STATIONS), post(register))
        .route(
            &format!("{}/{{id}}", route(protocol::REGISTRY_STATIONS)),
            delete(deregister),
        )
        .route(&route(protocol::REGISTRY_LOOKUP), get(lookup))
}

async fn register(
    State(state): State<RegistryState>,
    Json(registration): Json<Registration>,
) -> StatusCode {
    debug!(
        station = %registration.id,
        url = %registration.url,
        lease_secs = registration.lease_secs,
        "registration"
    );
    state.registrations().register(registration, Instant::now());
    StatusCode::NO_CONTENT
}

async fn deregister(State(state): State<RegistryState>, Path(id): Path<String>) -> StatusCode {
    if state.registrations().deregister(&id) {
        info!(station = %id, "station deregistered");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn lookup(
    State(state): State<RegistryState>,
    Query(query): Query<LookupQuery>,
) -> Json<LookupResponse> {
    let stations = state.registrations().lookup(
        &query.service_type,
        query.max_results,
        Instant::now(),
    );
    Json(LookupResponse { stations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tag_runner::core::station::STATION_SERVICE_TYPE;
    use tower::ServiceExt;

    fn registration(id: &str, lease_secs: u64) -> Registration {
        Registration {
            id: id.to_string(),
            url: format!("http://{id}.test"),
            service_type: STATION_SERVICE_TYPE.to_string(),
            lease_secs,
        }
    }

    fn ids(entries: &[StationEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    #[test]
    fn lookup_caps_results_in_registration_order() {
        let now = Instant::now();
        let mut registrations = Registrations::default();
        for id in ["a", "b", "c"] {
            registrations.register(registration(id, 30), now);
        }

        let found = registrations.lookup(STATION_SERVICE_TYPE, 2, now);

        assert_eq!(ids(&found), vec!["a", "b"]);
    }

    #[test]
    fn expired_leases_drop_out() {
        let now = Instant::now();
        let mut registrations = Registrations::default();
        registrations.register(registration("short", 1), now);
        registrations.register(registration("long", 60), now);

        let later = now + Duration::from_secs(5);
        let found = registrations.lookup(STATION_SERVICE_TYPE, 8, later);

        assert_eq!(ids(&found), vec!["long"]);
    }

    #[test]
    fn renewal_extends_the_lease_and_keeps_position() {
        let now = Instant::now();
        let mut registrations = Registrations::default();
        registrations.register(registration("a", 2), now);
        registrations.register(registration("b", 60), now);
        registrations.register(registration("a", 2), now + Duration::from_secs(1));

        let found =
            registrations.lookup(STATION_SERVICE_TYPE, 8, now + Duration::from_secs(2));

        assert_eq!(ids(&found), vec!["a", "b"]);
    }

    #[test]
    fn other_service_types_are_filtered() {
        let now = Instant::now();
        let mut registrations = Registrations::default();
        let mut printer = registration("printer", 30);
        printer.service_type = "print.v1".to_string();
        registrations.register(printer, now);
        registrations.register(registration("s1", 30), now);

        let found = registrations.lookup(STATION_SERVICE_TYPE, 8, now);

        assert_eq!(ids(&found), vec!["s1"]);
    }

    #[tokio::test]
    async fn register_then_lookup_over_http() {
        let state = RegistryState::default();
        let app = registry_router().with_state(state);

        let body = serde_json::to_vec(&registration("s1", 30)).expect("encode");
        let response = app
            .clone()
            .oneshot(
                Request::post("/registry/stations")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::get("/registry/lookup?service_type=tag.station.v1&max_results=8")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let decoded: LookupResponse = serde_json::from_slice(&bytes).expect("decode");
        assert_eq!(ids(&decoded.stations), vec!["s1"]);
    }

    #[tokio::test]
    async fn deregister_unknown_station_is_not_found() {
        let app = registry_router().with_state(RegistryState::default());

        let response = app
            .oneshot(
                Request::delete("/registry/stations/ghost")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
