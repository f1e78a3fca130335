use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_MESSAGE_CHARS: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// A buyer/seller thread about one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub listing_id: String,
    pub participant_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub body: String,
}

impl NewMessage {
    /// Trims the body; empty and oversized messages are rejected.
    pub fn new(body: &str) -> Result<Self, String> {
        let body = body.trim();
        if body.is_empty() {
            return Err("message body must not be empty".to_string());
        }
        if body.chars().count() > MAX_MESSAGE_CHARS {
            return Err(format!("message body must be at most {} characters", MAX_MESSAGE_CHARS));
        }
        Ok(Self {
            body: body.to_string(),
        })
    }
}
