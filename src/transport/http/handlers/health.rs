use crate::transport::http::handlers::common::{fail_with, ok};
use crate::transport::http::types::{ApiResponse, AppState, CallCounters};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::atomic::Ordering;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = ApiResponse),
        (status = 503, description = "Service is marked unhealthy", body = ApiResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    CallCounters::bump(&state.counters.health);
    if state.healthy.load(Ordering::SeqCst) {
        ok(serde_json::json!({ "status": "ok" }))
    } else {
        fail_with(
            StatusCode::SERVICE_UNAVAILABLE,
            "service marked unhealthy",
            serde_json::json!({ "status": "unhealthy" }),
        )
    }
}
