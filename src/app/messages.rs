//! Buyer/seller messaging. Every call needs a session.

use crate::app::session_guard::SessionGuard;
use crate::domain::message::{Conversation, Message, NewMessage};
use crate::error::{ApiError, ApiResult};
use crate::infra::http::ApiClient;
use std::sync::Arc;

pub struct MessagesService {
    client: Arc<ApiClient>,
    session: SessionGuard,
}

impl MessagesService {
    pub fn new(client: Arc<ApiClient>, session: SessionGuard) -> Self {
        Self { client, session }
    }

    pub async fn conversations(&self) -> ApiResult<Vec<Conversation>> {
        let client = &self.client;
        self.session
            .require_auth(move || client.get_json("/conversations"))
            .await
    }

    pub async fn messages(&self, conversation_id: &str) -> ApiResult<Vec<Message>> {
        let client = &self.client;
        let path = format!("/conversations/{}/messages", conversation_id);
        let path_ref = path.as_str();
        self.session
            .require_auth(move || client.get_json(path_ref))
            .await
    }

    /// Rejects empty bodies before touching the network.
    pub async fn send(&self, conversation_id: &str, body: &str) -> ApiResult<Message> {
        let message = NewMessage::new(body).map_err(ApiError::Invalid)?;
        let client = &self.client;
        let message_ref = &message;
        let path = format!("/conversations/{}/messages", conversation_id);
        let path_ref = path.as_str();
        self.session
            .require_auth(move || client.post_json(path_ref, message_ref))
            .await
    }
}
