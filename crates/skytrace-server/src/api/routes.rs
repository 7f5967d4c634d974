//! REST API routes.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skytrace_tracker::TrackerStatus;

use crate::api::ws;
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/flights", get(list_flights))
        .route("/v1/paths", get(list_paths))
        .route("/v1/center", get(get_center).post(set_center))
        .route("/v1/status", get(get_status))
        .route("/v1/stream", get(ws::ws_handler))
}

/// Current snapshot as a GeoJSON FeatureCollection.
async fn list_flights(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.tracker.get_data().to_geojson())
}

/// Current trails as a GeoJSON FeatureCollection.
async fn list_paths(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.tracker.get_paths().to_geojson())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CenterRequest {
    pub lon: f64,
    pub lat: f64,
}

async fn get_center(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.tracker.center() {
        Some(center) => Json(json!({"lon": center.lon, "lat": center.lat})).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn set_center(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CenterRequest>,
) -> impl IntoResponse {
    let valid_lon = request.lon.is_finite() && (-180.0..=180.0).contains(&request.lon);
    let valid_lat = request.lat.is_finite() && (-90.0..=90.0).contains(&request.lat);
    if !valid_lon || !valid_lat {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "lon must be within [-180, 180] and lat within [-90, 90]"})),
        )
            .into_response();
    }

    state.tracker.set_center(request.lon, request.lat);
    Json(json!({"lon": request.lon, "lat": request.lat})).into_response()
}

async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tracker = &state.tracker;
    let status = match tracker.status() {
        TrackerStatus::Enabled => "enabled",
        TrackerStatus::Disabled => "disabled",
    };
    let snapshot = tracker.get_data();
    Json(json!({
        "status": status,
        "subscribers": tracker.subscriber_count(),
        "local_data": tracker.config().use_local_data || tracker.is_rate_limited(),
        "rate_limited": tracker.is_rate_limited(),
        "aircraft": snapshot.len(),
        "timestamp": snapshot.timestamp.to_rfc3339(),
    }))
}
