use crate::domain::settings::SettingsUpdate;
use crate::transport::http::handlers::common::{fail, ok, require_user};
use crate::transport::http::types::{ApiResponse, AppState, SettingsUpdateRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Current user's settings", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse)
    )
)]
pub async fn get_settings_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let user = match require_user(&state, &headers).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let store = state.store.read().await;
    ok(store.settings.get(&user.id).cloned().unwrap_or_default())
}

#[utoipa::path(
    patch,
    path = "/settings",
    request_body = SettingsUpdateRequest,
    responses(
        (status = 200, description = "Merged settings after the update", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse),
        (status = 422, description = "Unknown domain or invalid JSON body", body = ApiResponse)
    )
)]
pub async fn update_settings_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<SettingsUpdate>, JsonRejection>,
) -> impl IntoResponse {
    let user = match require_user(&state, &headers).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let Json(update) = match request {
        Ok(v) => v,
        Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid JSON body: {}", e)),
    };

    let mut store = state.store.write().await;
    let settings = store.settings.entry(user.id).or_default();
    settings.apply(update);
    ok(settings.clone())
}
