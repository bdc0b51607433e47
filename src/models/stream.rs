//! Live stream state: status, viewer count and the bounded chat log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    #[default]
    User,
    /// Join/leave notices generated by the server.
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChatEntry {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub username: String,
    pub content: String,
    #[serde(default)]
    pub kind: ChatKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_live: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveStream {
    pub id: u64,
    pub viewer_count: u64,
    pub status: Option<StreamStatus>,
    /// Oldest first.
    pub chat: VecDeque<StreamChatEntry>,
}

impl LiveStream {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Append, dropping the oldest entries beyond `capacity`.
    pub fn push_chat(&mut self, entry: StreamChatEntry, capacity: usize) {
        self.chat.push_back(entry);
        while self.chat.len() > capacity {
            self.chat.pop_front();
        }
    }
}
