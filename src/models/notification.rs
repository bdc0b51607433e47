//! Notification feed items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Follow,
    Like,
    Comment,
    Mention,
    Repost,
    Messaged,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NotificationWire")]
pub struct Notification {
    pub id: i64,
    pub category: NotificationCategory,
    pub actor: Option<UserSummary>,
    pub text: Option<String>,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
}

/// Server notification shape; `timestamp` and `created_at` may both be sent.
#[derive(Deserialize)]
struct NotificationWire {
    id: i64,
    #[serde(default, alias = "notification_type")]
    category: NotificationCategory,
    #[serde(default)]
    actor: Option<UserSummary>,
    #[serde(default, alias = "message")]
    text: Option<String>,
    #[serde(default)]
    is_read: bool,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<NotificationWire> for Notification {
    fn from(wire: NotificationWire) -> Self {
        Notification {
            id: wire.id,
            category: wire.category,
            actor: wire.actor,
            text: wire.text,
            is_read: wire.is_read,
            timestamp: wire.timestamp.or(wire.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Feed filter accepted by the notifications endpoint (`?filter=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFilter {
    #[default]
    All,
    Verified,
    Mentions,
}
