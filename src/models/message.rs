//! Direct messages and conversations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserSummary;

/// Message identity: server-assigned, or a client temp id (`tmp-…`) until confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Server(i64),
    Temp(String),
}

impl MessageId {
    /// Fresh client-generated temp id.
    pub fn temp() -> Self {
        MessageId::Temp(format!("tmp-{}", Uuid::new_v4().as_simple()))
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, MessageId::Temp(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Server(id) => write!(f, "{}", id),
            MessageId::Temp(id) => f.write_str(id),
        }
    }
}

/// Text body, or an ordered list of text segments (mentions, hashtags, plain runs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Segments(Vec<String>),
}

impl MessageContent {
    pub fn to_plain_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Segments(parts) => parts.concat(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.to_plain_text().trim().is_empty()
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Shown optimistically, request in flight.
    Pending,
    #[default]
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MessageWire")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: Option<i64>,
    /// Temp id echoed back by the server for messages this client sent.
    pub client_id: Option<String>,
    pub sender: UserSummary,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    #[serde(skip_serializing)]
    pub status: DeliveryStatus,
}

/// Server message shape. `timestamp` and `created_at` carry the same instant;
/// either or both may be present.
#[derive(Deserialize)]
struct MessageWire {
    id: MessageId,
    #[serde(default)]
    conversation_id: Option<i64>,
    #[serde(default)]
    client_id: Option<String>,
    sender: UserSummary,
    content: MessageContent,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    is_read: bool,
}

impl From<MessageWire> for Message {
    fn from(wire: MessageWire) -> Self {
        Self {
            id: wire.id,
            conversation_id: wire.conversation_id,
            client_id: wire.client_id,
            sender: wire.sender,
            content: wire.content,
            timestamp: wire.timestamp.or(wire.created_at).unwrap_or_else(Utc::now),
            is_read: wire.is_read,
            status: DeliveryStatus::Confirmed,
        }
    }
}

impl Message {
    /// Client-side pending message with a fresh temp id.
    pub fn pending(
        conversation_id: Option<i64>,
        sender: UserSummary,
        content: MessageContent,
    ) -> Self {
        Self {
            id: MessageId::temp(),
            conversation_id,
            client_id: None,
            sender,
            content,
            timestamp: Utc::now(),
            is_read: true,
            status: DeliveryStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DeliveryStatus::Pending
    }

    /// Whether this message is the server copy of the given temp id.
    pub fn confirms(&self, temp: &MessageId) -> bool {
        match (temp, &self.client_id) {
            (MessageId::Temp(t), Some(client_id)) => t == client_id,
            _ => false,
        }
    }
}

/// A direct conversation as listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    /// The other participant.
    pub user: UserSummary,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default)]
    pub last_message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_id_accepts_number_or_string() {
        let server: MessageId = serde_json::from_value(json!(12)).unwrap();
        let temp: MessageId = serde_json::from_value(json!("tmp-1")).unwrap();
        assert_eq!(server, MessageId::Server(12));
        assert_eq!(temp, MessageId::Temp("tmp-1".into()));
        assert!(temp.is_temp());
    }

    #[test]
    fn temp_ids_are_unique_and_prefixed() {
        let a = MessageId::temp();
        let b = MessageId::temp();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("tmp-"));
    }

    #[test]
    fn segments_join_in_order() {
        let content = MessageContent::Segments(vec!["hi ".into(), "@bob".into(), "!".into()]);
        assert_eq!(content.to_plain_text(), "hi @bob!");
        assert!(!content.is_blank());
    }

    #[test]
    fn message_parses_server_shape() {
        let msg: Message = serde_json::from_value(json!({
            "id": 4,
            "conversation_id": 10,
            "sender": { "id": 2, "username": "alice" },
            "content": "goal!",
            "created_at": "2024-05-01T12:00:00Z",
            "is_read": false
        }))
        .unwrap();
        assert_eq!(msg.id, MessageId::Server(4));
        assert_eq!(msg.status, DeliveryStatus::Confirmed);
        assert_eq!(msg.content.to_plain_text(), "goal!");
    }

    #[test]
    fn message_parses_full_serializer_shape() {
        let msg: Message = serde_json::from_value(json!({
            "id": 7,
            "sender": { "id": 2, "username": "alice", "email": "alice@example.com" },
            "content": "see you there",
            "timestamp": "2024-05-01T12:00:00Z",
            "created_at": "2024-05-01T12:00:00Z",
            "is_read": true,
            "read_at": null,
            "reply_to": null
        }))
        .unwrap();
        assert_eq!(msg.id, MessageId::Server(7));
        assert_eq!(msg.sender.username, "alice");
        assert_eq!(msg.timestamp.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert!(msg.is_read);
    }

    #[test]
    fn confirms_matches_client_id() {
        let pending = Message::pending(Some(1), UserSummary::new(Some(1), "me"), "hey".into());
        let mut echoed = pending.clone();
        echoed.id = MessageId::Server(6);
        echoed.client_id = Some(pending.id.to_string());
        assert!(echoed.confirms(&pending.id));
        assert!(!echoed.confirms(&MessageId::Server(6)));
    }
}
