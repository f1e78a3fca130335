use crate::domain::message::{Message, NewMessage};
use crate::transport::http::handlers::common::{fail, ok, require_user};
use crate::transport::http::types::{ApiResponse, AppState, SendMessageRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

#[utoipa::path(
    get,
    path = "/conversations",
    responses(
        (status = 200, description = "Conversations the user takes part in", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse)
    )
)]
pub async fn conversations_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let user = match require_user(&state, &headers).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let store = state.store.read().await;
    let mine: Vec<_> = store
        .conversations
        .iter()
        .filter(|c| c.participant_ids.contains(&user.id))
        .cloned()
        .collect();
    ok(mine)
}

#[utoipa::path(
    get,
    path = "/conversations/{id}/messages",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse),
        (status = 404, description = "No such conversation for this user", body = ApiResponse)
    )
)]
pub async fn messages_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user = match require_user(&state, &headers).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let store = state.store.read().await;
    let member = store
        .conversations
        .iter()
        .any(|c| c.id == id && c.participant_ids.contains(&user.id));
    if !member {
        return fail(StatusCode::NOT_FOUND, format!("Conversation '{}' not found", id));
    }
    let mut messages: Vec<Message> = store
        .messages
        .iter()
        .filter(|m| m.conversation_id == id)
        .cloned()
        .collect();
    messages.sort_by_key(|m| m.sent_at);
    ok(messages)
}

#[utoipa::path(
    post,
    path = "/conversations/{id}/messages",
    params(("id" = String, Path, description = "Conversation id")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message stored", body = ApiResponse),
        (status = 400, description = "Empty or oversized body", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse),
        (status = 404, description = "No such conversation for this user", body = ApiResponse)
    )
)]
pub async fn send_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    request: Result<Json<SendMessageRequest>, JsonRejection>,
) -> impl IntoResponse {
    let user = match require_user(&state, &headers).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid JSON body: {}", e)),
    };
    let body = match NewMessage::new(&request.body) {
        Ok(m) => m.body,
        Err(e) => return fail(StatusCode::BAD_REQUEST, e),
    };

    let mut store = state.store.write().await;
    let message_id = store.next_id("m");
    let Some(conversation) = store
        .conversations
        .iter_mut()
        .find(|c| c.id == id && c.participant_ids.contains(&user.id))
    else {
        return fail(StatusCode::NOT_FOUND, format!("Conversation '{}' not found", id));
    };

    let message = Message {
        id: message_id,
        conversation_id: id,
        sender_id: user.id,
        body,
        sent_at: Utc::now(),
    };
    conversation.last_message = Some(message.clone());
    conversation.unread_count += 1;
    store.messages.push(message.clone());
    ok(message)
}
