//! Notification kinds and their presentation lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage { conversation_id: String },
    ListingApproved { listing_id: String },
    ListingRejected { listing_id: String, reason: String },
    ListingExpired { listing_id: String },
    PriceDrop { listing_id: String, old_price: u64, new_price: u64 },
    FavouriteSold { listing_id: String },
    System { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(flatten)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationStyle {
    pub color: &'static str,
    pub icon: &'static str,
    /// In-app path opened when the notification is tapped. `None` for informational kinds.
    pub action_path: Option<String>,
}

impl NotificationKind {
    pub fn style(&self) -> NotificationStyle {
        let (color, icon) = match self {
            NotificationKind::NewMessage { .. } => ("#2563eb", "message-circle"),
            NotificationKind::ListingApproved { .. } => ("#16a34a", "check-circle"),
            NotificationKind::ListingRejected { .. } => ("#dc2626", "x-circle"),
            NotificationKind::ListingExpired { .. } => ("#d97706", "clock"),
            NotificationKind::PriceDrop { .. } => ("#7c3aed", "trending-down"),
            NotificationKind::FavouriteSold { .. } => ("#6b7280", "heart-off"),
            NotificationKind::System { .. } => ("#0f172a", "info"),
        };
        NotificationStyle {
            color,
            icon,
            action_path: self.action_path(),
        }
    }

    pub fn action_path(&self) -> Option<String> {
        match self {
            NotificationKind::NewMessage { conversation_id } => {
                Some(format!("/messages/{}", conversation_id))
            }
            NotificationKind::ListingApproved { listing_id }
            | NotificationKind::PriceDrop { listing_id, .. }
            | NotificationKind::FavouriteSold { listing_id } => {
                Some(format!("/listings/{}", listing_id))
            }
            NotificationKind::ListingRejected { listing_id, .. }
            | NotificationKind::ListingExpired { listing_id } => {
                Some(format!("/listings/{}/edit", listing_id))
            }
            NotificationKind::System { .. } => None,
        }
    }
}
