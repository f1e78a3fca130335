use crate::transport::http::handlers::common::{
    clear_cookie, cookie, fail, ok, require_user, set_cookie, REFRESH_COOKIE, SESSION_COOKIE,
};
use crate::transport::http::types::{ApiResponse, AppState, CallCounters, LoginRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session and refresh cookies set", body = ApiResponse),
        (status = 401, description = "Wrong email or password", body = ApiResponse),
        (status = 422, description = "Invalid JSON body", body = ApiResponse)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    CallCounters::bump(&state.counters.login);
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return fail(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid JSON body: {} (expected: {{\"email\", \"password\"}})", e),
            )
        }
    };

    let mut store = state.store.write().await;
    let Some(user) = store.check_credentials(&request.email, &request.password) else {
        return fail(StatusCode::UNAUTHORIZED, "invalid credentials");
    };
    let (session, refresh) = store.issue_tokens(&user.id);
    drop(store);

    let mut response = ok(&user);
    set_cookie(&mut response, SESSION_COOKIE, &session);
    set_cookie(&mut response, REFRESH_COOKIE, &refresh);
    response
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Tokens rotated; new cookies set", body = ApiResponse),
        (status = 401, description = "Missing or revoked refresh token", body = ApiResponse)
    )
)]
pub async fn refresh_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    CallCounters::bump(&state.counters.refresh);
    let rotated = match cookie(&headers, REFRESH_COOKIE) {
        Some(token) => state.store.write().await.rotate(&token),
        None => None,
    };

    match rotated {
        Some((session, refresh)) => {
            let mut response = ok(serde_json::json!({ "refreshed": true }));
            set_cookie(&mut response, SESSION_COOKIE, &session);
            set_cookie(&mut response, REFRESH_COOKIE, &refresh);
            response
        }
        None => {
            let mut response = fail(StatusCode::UNAUTHORIZED, "refresh token invalid");
            clear_cookie(&mut response, SESSION_COOKIE);
            clear_cookie(&mut response, REFRESH_COOKIE);
            response
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse)
    )
)]
pub async fn me_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    CallCounters::bump(&state.counters.me);
    match require_user(&state, &headers).await {
        Ok(user) => ok(user),
        Err(resp) => resp,
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session revoked and cookies cleared", body = ApiResponse)
    )
)]
pub async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    CallCounters::bump(&state.counters.logout);
    let session = cookie(&headers, SESSION_COOKIE);
    let refresh = cookie(&headers, REFRESH_COOKIE);
    state
        .store
        .write()
        .await
        .revoke(session.as_deref(), refresh.as_deref());

    let mut response = ok(serde_json::json!({ "logged_out": true }));
    clear_cookie(&mut response, SESSION_COOKIE);
    clear_cookie(&mut response, REFRESH_COOKIE);
    response
}
