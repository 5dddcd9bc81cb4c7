//! HTTP route handlers: legs, reports, review queue.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ifta_engine::NewLeg;
use ifta_tracker::{date_scope, FixedLocation};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::state::AppState;
use super::{json_error, tracker_error};
use crate::parse_date;

/// Body of `POST /legs/deadhead-return`.
#[derive(Debug, Deserialize)]
struct DeadheadReturnRequest {
    truck_identifier: String,
    current_latitude: f64,
    current_longitude: f64,
    #[serde(default)]
    starting_odometer: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct StartRequest {
    #[serde(default)]
    starting_odometer: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct CompleteRequest {
    #[serde(default)]
    ending_odometer: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    reviewer: String,
    #[serde(default)]
    note: String,
}

/// Decode a JSON body, rejecting with a 400 JSON error.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body)
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, &format!("invalid request body: {}", e)))
}

/// Decode an optional JSON body; an empty body yields the default.
fn parse_optional_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_body(body)
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// POST /legs
pub(crate) async fn handle_create_leg(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let new_leg: NewLeg = match parse_body(&body) {
        Ok(l) => l,
        Err(resp) => return resp,
    };
    match state.tracker.create_leg(new_leg).await {
        Ok(leg) => (StatusCode::CREATED, Json(leg)).into_response(),
        Err(e) => tracker_error(e),
    }
}

/// POST /legs/deadhead-return
pub(crate) async fn handle_create_deadhead_return(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let request: DeadheadReturnRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let location = match FixedLocation::new(request.current_latitude, request.current_longitude) {
        Ok(l) => l,
        Err(e) => return tracker_error(e),
    };
    match state
        .tracker
        .create_deadhead_return(&request.truck_identifier, &location, request.starting_odometer)
        .await
    {
        Ok(leg) => (StatusCode::CREATED, Json(leg)).into_response(),
        Err(e) => tracker_error(e),
    }
}

/// GET /legs/{id}
pub(crate) async fn handle_get_leg(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.tracker.get_leg(&id).await {
        Ok(leg) => (StatusCode::OK, Json(leg)).into_response(),
        Err(e) => tracker_error(e),
    }
}

/// POST /legs/{id}/route
pub(crate) async fn handle_route_leg(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.tracker.calculate_route(&id).await {
        Ok(leg) => (StatusCode::OK, Json(leg)).into_response(),
        Err(e) => tracker_error(e),
    }
}

/// POST /legs/{id}/start
pub(crate) async fn handle_start_leg(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let request: StartRequest = match parse_optional_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state.tracker.start_leg(&id, request.starting_odometer).await {
        Ok(leg) => (StatusCode::OK, Json(leg)).into_response(),
        Err(e) => tracker_error(e),
    }
}

/// POST /legs/{id}/complete
pub(crate) async fn handle_complete_leg(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let request: CompleteRequest = match parse_optional_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state.tracker.complete_leg(&id, request.ending_odometer).await {
        Ok(leg) => (StatusCode::OK, Json(leg)).into_response(),
        Err(e) => tracker_error(e),
    }
}

/// GET /report?from=YYYY-MM-DD&to=YYYY-MM-DD[&truck=...]
pub(crate) async fn handle_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (from, to) = match (params.get("from"), params.get("to")) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "'from' and 'to' query parameters are required",
            )
        }
    };
    let (from, to) = match (parse_date(from), parse_date(to)) {
        (Ok(from), Ok(to)) => (from, to),
        (Err(e), _) | (_, Err(e)) => return json_error(StatusCode::BAD_REQUEST, &e),
    };
    let truck = params.get("truck").filter(|t| !t.is_empty()).cloned();

    match state.reports.get_report(&date_scope(from, to, truck)).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => tracker_error(e),
    }
}

/// GET /reviews[?all=true]
pub(crate) async fn handle_list_reviews(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let all = params.get("all").is_some_and(|v| v == "true" || v == "1");
    match state.tracker.list_reviews(!all).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => tracker_error(e),
    }
}

/// POST /reviews/{id}/resolve
pub(crate) async fn handle_resolve_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let request: ResolveRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state
        .tracker
        .resolve_review(&id, &request.reviewer, &request.note)
        .await
    {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => tracker_error(e),
    }
}
