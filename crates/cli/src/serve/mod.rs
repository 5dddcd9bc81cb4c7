//! `ifta serve` -- HTTP JSON API for the trip leg tracker.
//!
//! Endpoints:
//! - GET  /health                     - Server status
//! - POST /legs                       - Create a PENDING leg
//! - POST /legs/deadhead-return       - Deadhead leg from a live position to the terminal
//! - GET  /legs/{id}                  - Fetch a leg
//! - POST /legs/{id}/route            - Calculate and apportion the route
//! - POST /legs/{id}/start            - Start the leg (optional starting odometer)
//! - POST /legs/{id}/complete         - Complete the leg (optional ending odometer)
//! - GET  /report?from&to&truck       - IFTA worksheet for `[from, to)` (YYYY-MM-DD)
//! - GET  /reviews?all=true           - Odometer review queue
//! - POST /reviews/{id}/resolve       - Sign off a review item
//!
//! All responses use Content-Type: application/json. Errors carry
//! `{"error": ..., "code": ...}`.

mod handlers;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ifta_tracker::{ReportBuilder, TrackerConfig, TrackerError, TripLegTracker};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_complete_leg, handle_create_deadhead_return, handle_create_leg, handle_get_leg,
    handle_health, handle_list_reviews, handle_not_found, handle_report, handle_resolve_review,
    handle_route_leg, handle_start_leg,
};
use self::state::AppState;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// HTTP status for a tracker error, keyed on its stable code.
fn status_for(err: &TrackerError) -> StatusCode {
    match err.code() {
        "LEG_NOT_FOUND" | "REVIEW_NOT_FOUND" => StatusCode::NOT_FOUND,
        "STALE_STATE"
        | "LEG_IMMUTABLE"
        | "LEG_ALREADY_EXISTS"
        | "REVIEW_ALREADY_EXISTS"
        | "REVIEW_ALREADY_RESOLVED"
        | "ROUTE_IN_FLIGHT"
        | "INVALID_TRANSITION" => StatusCode::CONFLICT,
        "NO_ROUTE_FOUND" | "PROVIDER_COVERAGE_GAP" | "MALFORMED_RESPONSE" => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        "PROVIDER_TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
        "PROVIDER_UNAVAILABLE" => StatusCode::BAD_GATEWAY,
        "LOCATION_UNAVAILABLE" | "STORAGE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
        "CONFIG_ERROR" => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// JSON error response for a tracker error.
fn tracker_error(err: TrackerError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        log::error!("request failed [{}]: {}", err.code(), err);
    } else {
        log::debug!("request rejected [{}]: {}", err.code(), err);
    }
    (
        status,
        Json(serde_json::json!({ "error": err.to_string(), "code": err.code() })),
    )
        .into_response()
}

fn router(state: Arc<AppState>) -> Router {
    // CORS: permissive; the API is meant to sit behind a gateway.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/legs", post(handle_create_leg))
        .route("/legs/deadhead-return", post(handle_create_deadhead_return))
        .route("/legs/{id}", get(handle_get_leg))
        .route("/legs/{id}/route", post(handle_route_leg))
        .route("/legs/{id}/start", post(handle_start_leg))
        .route("/legs/{id}/complete", post(handle_complete_leg))
        .route("/report", get(handle_report))
        .route("/reviews", get(handle_list_reviews))
        .route("/reviews/{id}/resolve", post(handle_resolve_review))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port.
///
/// The store, provider, terminal and policy all come from `config`; a
/// misconfigured provider fails here rather than on the first request.
pub async fn start_server(
    port: u16,
    config: TrackerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = config.open_store().await?;
    let tracker = TripLegTracker::from_config(&config, store.clone())?;
    if tracker.terminal().is_none() {
        log::warn!("no terminal configured; deadhead returns will be rejected");
    }

    let state = Arc::new(AppState {
        tracker,
        reports: ReportBuilder::new(store),
    });

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("IFTA tracker listening on http://0.0.0.0:{}", port);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}
