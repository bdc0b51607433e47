//! Inbound and outbound WebSocket frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::message::{DeliveryStatus, Message, MessageContent, MessageId};
use super::notification::Notification;
use super::stream::{ChatKind, StreamChatEntry, StreamStatus};
use super::user::UserSummary;
use crate::error::SyncResult;

/// Frame pushed by the server, classified by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Authoritative unread count; always overrides local increments.
    UnreadCountUpdate { unread_count: u64 },
    NewNotification {
        #[serde(default)]
        notification: Option<Notification>,
    },
    /// Conversation delivery envelope.
    Message { message: Message },
    #[serde(alias = "stream_chat")]
    ChatMessage(ChatMessageEvent),
    ViewerCountUpdate {
        #[serde(default)]
        viewer_count: u64,
    },
    #[serde(alias = "stream_status", alias = "stream_update")]
    StreamStatusUpdate(StreamStatusEvent),
    StreamConnected {
        #[serde(default, deserialize_with = "lenient_id")]
        stream_id: Option<u64>,
    },
    TypingStart { user: UserSummary },
    TypingStop,
    #[serde(alias = "pong")]
    HeartbeatAck,
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl InboundEvent {
    /// Discriminator as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::UnreadCountUpdate { .. } => "unread_count_update",
            InboundEvent::NewNotification { .. } => "new_notification",
            InboundEvent::Message { .. } => "message",
            InboundEvent::ChatMessage(_) => "chat_message",
            InboundEvent::ViewerCountUpdate { .. } => "viewer_count_update",
            InboundEvent::StreamStatusUpdate(_) => "stream_status_update",
            InboundEvent::StreamConnected { .. } => "stream_connected",
            InboundEvent::TypingStart { .. } => "typing_start",
            InboundEvent::TypingStop => "typing_stop",
            InboundEvent::HeartbeatAck => "heartbeat_ack",
            InboundEvent::Error { .. } => "error",
            InboundEvent::Unknown => "unknown",
        }
    }
}

/// Chat line, either in a conversation or a live stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageEvent {
    #[serde(default)]
    pub id: Option<MessageId>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(alias = "message")]
    pub content: MessageContent,
    #[serde(default)]
    pub message_type: ChatKind,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessageEvent {
    pub fn into_message(self) -> Message {
        let id = self
            .id
            .or_else(|| self.client_id.clone().map(MessageId::Temp))
            .unwrap_or_else(MessageId::temp);
        Message {
            id,
            conversation_id: self.conversation_id,
            client_id: self.client_id,
            sender: UserSummary::new(self.user_id, self.username),
            content: self.content,
            timestamp: self.timestamp,
            is_read: false,
            status: DeliveryStatus::Confirmed,
        }
    }

    pub fn into_stream_entry(self) -> StreamChatEntry {
        StreamChatEntry {
            user_id: self.user_id,
            username: self.username,
            content: self.content.to_plain_text(),
            kind: self.message_type,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamStatusEvent {
    #[serde(default, deserialize_with = "lenient_id")]
    pub stream_id: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_live: Option<bool>,
    #[serde(default)]
    pub viewer_count: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl StreamStatusEvent {
    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            status: self.status.clone(),
            is_live: self.is_live,
            title: self.title.clone(),
        }
    }
}

/// Ids arrive as numbers or, from URL kwargs, numeric strings.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// Frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Keep-alive; `timestamp` is epoch milliseconds.
    Heartbeat { timestamp: i64 },
    ChatMessage { content: String },
}

/// Chat text typed by the user, checked before it goes on the wire.
#[derive(Debug, Clone, Validate)]
pub struct ChatDraft {
    #[validate(length(min = 1, max = 500, message = "message must be 1-500 characters"))]
    pub content: String,
}

impl OutboundFrame {
    pub fn heartbeat_at(now: DateTime<Utc>) -> Self {
        OutboundFrame::Heartbeat {
            timestamp: now.timestamp_millis(),
        }
    }

    /// Trimmed and validated chat frame.
    pub fn chat(content: &str) -> SyncResult<Self> {
        let draft = ChatDraft {
            content: content.trim().to_string(),
        };
        draft.validate()?;
        Ok(OutboundFrame::ChatMessage {
            content: draft.content,
        })
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
