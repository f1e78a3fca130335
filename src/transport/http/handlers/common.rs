use crate::domain::user::User;
use crate::transport::http::types::{ApiResponse, AppState};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const SESSION_COOKIE: &str = crate::app::session_guard::SESSION_COOKIE;
pub const REFRESH_COOKIE: &str = "refresh_token";

pub fn ok<T: Serialize>(data: T) -> Response {
    match serde_json::to_value(data) {
        Ok(value) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(value),
                error: None,
            }),
        )
            .into_response(),
        Err(e) => fail(StatusCode::INTERNAL_SERVER_ERROR, format!("serialization failed: {}", e)),
    }
}

pub fn fail(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(error.into()),
        }),
    )
        .into_response()
}

pub fn fail_with<T: Serialize>(status: StatusCode, error: impl Into<String>, data: T) -> Response {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: serde_json::to_value(data).ok(),
            error: Some(error.into()),
        }),
    )
        .into_response()
}

/// Value of a request cookie, if present.
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn set_cookie(response: &mut Response, name: &str, value: &str) {
    let raw = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if let Ok(header) = HeaderValue::from_str(&raw) {
        response.headers_mut().append(SET_COOKIE, header);
    }
}

pub fn clear_cookie(response: &mut Response, name: &str) {
    let raw = format!("{}=; Path=/; HttpOnly; Max-Age=0", name);
    if let Ok(header) = HeaderValue::from_str(&raw) {
        response.headers_mut().append(SET_COOKIE, header);
    }
}

/// Resolves the session cookie to a user or produces the 401 response.
pub async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, Response> {
    let Some(token) = cookie(headers, SESSION_COOKIE) else {
        return Err(fail(StatusCode::UNAUTHORIZED, "missing session"));
    };
    state
        .store
        .read()
        .await
        .user_for_session(&token)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "session expired"))
}
