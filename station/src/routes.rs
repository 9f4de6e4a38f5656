//! HTTP route handlers for the station contract.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};

use tag_runner::core::command::MigrationCommand;
use tag_runner::core::station::{Station, StationError};
use tag_runner::io::protocol::{
    self, ItResponse, OccupantsResponse, PONG, PropertyResponse, TagResponse, route,
};

use crate::state::AppState;

/// Build the station router.
pub fn station_router() -> Router<AppState> {
    let occupants = route(protocol::OCCUPANTS);
    Router::new()
        .route(&route(protocol::PING), get(ping))
        .route(
            &format!("{}/{{key}}", route(protocol::PROPERTIES)),
            get(get_property),
        )
        .route(&route(protocol::ACCEPT), post(accept))
        .route(&occupants, get(list_occupants))
        .route(&format!("{occupants}/{{id}}/tag"), post(tag_occupant))
        .route(&format!("{occupants}/{{id}}/it"), get(occupant_it))
}

type HandlerError = (StatusCode, String);

fn into_response_error(err: StationError) -> HandlerError {
    let status = match err {
        StationError::EntryPointRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StationError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StationError::Protocol(_) => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

async fn ping() -> &'static str {
    PONG
}

/// GET /station/properties/{key}
async fn get_property(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<PropertyResponse>, HandlerError> {
    let value = state.host.property(&key).map_err(into_response_error)?;
    Ok(Json(PropertyResponse { value }))
}

/// POST /station/accept - an unknown entry point fails JSON extraction with 422.
async fn accept(
    State(state): State<AppState>,
    Json(command): Json<MigrationCommand>,
) -> Result<StatusCode, HandlerError> {
    state.host.admit(command).map_err(into_response_error)?;
    Ok(StatusCode::ACCEPTED)
}

async fn list_occupants(
    State(state): State<AppState>,
) -> Result<Json<OccupantsResponse>, HandlerError> {
    let ids = state.host.occupant_ids().map_err(into_response_error)?;
    Ok(Json(OccupantsResponse { ids }))
}

async fn tag_occupant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TagResponse>, HandlerError> {
    let tagged = state.host.attempt_tag(&id).map_err(into_response_error)?;
    Ok(Json(TagResponse { tagged }))
}

async fn occupant_it(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItResponse>, HandlerError> {
    let it = state.host.is_occupant_it(&id).map_err(into_response_error)?;
    Ok(Json(ItResponse { it }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tokio::runtime::Handle;
    use tower::ServiceExt;

    use tag_runner::core::station::StationRef;
    use tag_runner::test_support::{FakeStation, RecordingSleeper, ScriptedRegistry};

    use crate::host::StationHost;
    use crate::host::tests::{command, config, wait_until};

    fn app_with(next: &Arc<FakeStation>) -> (Router, Arc<StationHost>) {
        let host = StationHost::new(
            config("here"),
            Arc::new(ScriptedRegistry::new(vec![Ok(vec![
                next.clone() as StationRef
            ])])),
            Arc::new(RecordingSleeper::default()),
            Handle::current(),
        );
        let app = station_router().with_state(AppState::new(host.clone()));
        (app, host)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("decode")
    }

    fn post_json(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request")
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let (app, _host) = app_with(&Arc::new(FakeStation::new("next")));

        let response = app
            .oneshot(
                Request::get("/station/ping")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&bytes[..], PONG.as_bytes());
    }

    #[tokio::test]
    async fn id_property_is_served_case_insensitively() {
        let (app, _host) = app_with(&Arc::new(FakeStation::new("next")));

        let response = app
            .oneshot(
                Request::get("/station/properties/ID")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let decoded: PropertyResponse = body_json(response).await;
        assert_eq!(decoded.value.as_deref(), Some("here"));
    }

    #[tokio::test]
    async fn accepted_runner_is_forwarded() {
        let next = Arc::new(FakeStation::new("next"));
        let (app, _host) = app_with(&next);
        let body = serde_json::to_vec(&command("r1")).expect("encode");

        let response = app
            .oneshot(post_json("/station/accept", body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_until(|| next.accepted().len() == 1).await;
    }

    #[tokio::test]
    async fn unknown_entry_point_is_unprocessable() {
        let (app, host) = app_with(&Arc::new(FakeStation::new("next")));
        let mut body = serde_json::to_value(command("r1")).expect("encode");
        body["entry_point"] = serde_json::json!("sideways");

        let response = app
            .oneshot(post_json(
                "/station/accept",
                serde_json::to_vec(&body).expect("encode"),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(host.occupant_ids().expect("ids").is_empty());
    }

    #[tokio::test]
    async fn tagging_an_unknown_occupant_reports_false() {
        let (app, _host) = app_with(&Arc::new(FakeStation::new("next")));

        let response = app
            .clone()
            .oneshot(
                Request::post("/station/occupants/ghost/tag")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let tagged: TagResponse = body_json(response).await;
        assert!(!tagged.tagged);

        let response = app
            .oneshot(
                Request::get("/station/occupants/ghost/it")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let it: ItResponse = body_json(response).await;
        assert!(!it.it);
    }
}
