//! Channel identities and connection status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthToken;
use crate::error::SyncError;

/// One logical real-time stream. String form: `notifications`, `chat:<username>`,
/// `stream:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Global per-user notification alerts.
    Notifications,
    /// Direct conversation with one user.
    Chat { username: String },
    /// Live stream chat and viewer count.
    Stream { stream_id: u64 },
}

impl Channel {
    pub fn chat(username: impl Into<String>) -> Self {
        Channel::Chat {
            username: username.into(),
        }
    }

    pub fn stream(stream_id: u64) -> Self {
        Channel::Stream { stream_id }
    }

    /// Endpoint path below the WebSocket base, with trailing slash.
    pub fn path(&self) -> String {
        match self {
            Channel::Notifications => "notifications/".to_string(),
            Channel::Chat { username } => format!("chat/{}/", username),
            Channel::Stream { stream_id } => format!("posts/stream/{}/", stream_id),
        }
    }

    /// Chat usernames must be a single path-safe word.
    pub fn validate(&self) -> Result<(), SyncError> {
        match self {
            Channel::Chat { username } if !is_word(username) => {
                Err(SyncError::InvalidChannel(self.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Full connect URL: `<base>/<path>?token=<auth>`.
    pub fn url(&self, base: &str, token: &AuthToken) -> String {
        format!(
            "{}/{}?token={}",
            base.trim_end_matches('/'),
            self.path(),
            token.as_str()
        )
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Notifications => write!(f, "notifications"),
            Channel::Chat { username } => write!(f, "chat:{}", username),
            Channel::Stream { stream_id } => write!(f, "stream:{}", stream_id),
        }
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

impl FromStr for Channel {
    type Err = SyncError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name == "notifications" {
            return Ok(Channel::Notifications);
        }
        if let Some(username) = name.strip_prefix("chat:") {
            if is_word(username) {
                return Ok(Channel::chat(username));
            }
        } else if let Some(id) = name.strip_prefix("stream:") {
            if let Ok(stream_id) = id.parse() {
                return Ok(Channel::stream(stream_id));
            }
        }
        Err(SyncError::InvalidChannel(name.to_string()))
    }
}

/// Socket lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Status published by a channel session for presence indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// When the last heartbeat frame went out.
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// A reconnect timer is armed.
    pub reconnect_pending: bool,
    /// Connect attempts after the first one.
    pub reconnect_attempts: u32,
}

impl ChannelStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_from_name_notifications() {
        assert_eq!(
            "notifications".parse::<Channel>().unwrap(),
            Channel::Notifications
        );
    }

    #[test]
    fn channel_from_name_chat() {
        assert_eq!("chat:alice".parse::<Channel>().unwrap(), Channel::chat("alice"));
        assert!("chat:".parse::<Channel>().is_err());
        assert!("chat:al/ice".parse::<Channel>().is_err());
    }

    #[test]
    fn validate_rejects_path_breaking_usernames() {
        assert!(Channel::chat("bob_1").validate().is_ok());
        assert!(Channel::stream(3).validate().is_ok());
        for bad in ["", "a b", "al/ice", "x?token=y"] {
            assert!(Channel::chat(bad).validate().is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn channel_from_name_stream() {
        assert_eq!("stream:42".parse::<Channel>().unwrap(), Channel::stream(42));
        assert!("stream:abc".parse::<Channel>().is_err());
    }

    #[test]
    fn display_round_trips_name() {
        for name in ["notifications", "chat:bob_1", "stream:9"] {
            assert_eq!(name.parse::<Channel>().unwrap().to_string(), name);
        }
    }

    #[test]
    fn url_includes_path_and_token() {
        let token = AuthToken::new("abc123");
        assert_eq!(
            Channel::chat("alice").url("ws://127.0.0.1:8000/ws/", &token),
            "ws://127.0.0.1:8000/ws/chat/alice/?token=abc123"
        );
        assert_eq!(
            Channel::stream(7).url("ws://h/ws", &token),
            "ws://h/ws/posts/stream/7/?token=abc123"
        );
    }
}
