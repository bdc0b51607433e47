//! In-memory backend implementing [`RestApi`], with per-operation failure injection.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::rest::RestApi;
use crate::error::{SyncError, SyncResult};
use crate::models::{
    Conversation, DeliveryStatus, Message, MessageContent, MessageId, Notification,
    NotificationCategory, NotificationFilter, RelationKey, UserSummary,
};

struct State {
    me: UserSummary,
    unread_count: u64,
    notifications: Vec<Notification>,
    conversations: Vec<Conversation>,
    messages: HashMap<i64, Vec<Message>>,
    relations: HashMap<RelationKey, bool>,
    next_message_id: i64,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
}

pub struct InMemoryApi {
    state: Mutex<State>,
}

impl InMemoryApi {
    /// Empty backend; messages sent through it are authored by `me`.
    pub fn new(me: UserSummary) -> Self {
        Self {
            state: Mutex::new(State {
                me,
                unread_count: 0,
                notifications: Vec::new(),
                conversations: Vec::new(),
                messages: HashMap::new(),
                relations: HashMap::new(),
                next_message_id: 1,
                failing: HashSet::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub async fn set_unread_count(&self, count: u64) {
        self.state.lock().await.unread_count = count;
    }

    pub async fn set_notifications(&self, notifications: Vec<Notification>) {
        self.state.lock().await.notifications = notifications;
    }

    /// Add a conversation with its stored history. Later sends continue after the
    /// highest stored id.
    pub async fn add_conversation(&self, conversation: Conversation, history: Vec<Message>) {
        let mut state = self.state.lock().await;
        for m in &history {
            if let MessageId::Server(id) = m.id {
                state.next_message_id = state.next_message_id.max(id + 1);
            }
        }
        state.messages.insert(conversation.id, history);
        state.conversations.push(conversation);
    }

    /// Reserve the next server id, as if another client had sent a message.
    pub async fn reserve_message_id(&self) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_message_id;
        state.next_message_id += 1;
        id
    }

    pub async fn set_relation_value(&self, key: RelationKey, value: bool) {
        self.state.lock().await.relations.insert(key, value);
    }

    pub async fn relation_value(&self, key: RelationKey) -> Option<bool> {
        self.state.lock().await.relations.get(&key).copied()
    }

    /// Make every call to `operation` fail with an API error until [`Self::recover`].
    pub async fn fail(&self, operation: &'static str) {
        self.state.lock().await.failing.insert(operation);
    }

    pub async fn recover(&self, operation: &'static str) {
        self.state.lock().await.failing.remove(operation);
    }

    /// Operation names in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    async fn enter(&self, operation: &'static str) -> SyncResult<tokio::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().await;
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            return Err(SyncError::Api(format!("{} failed", operation)));
        }
        Ok(state)
    }
}

#[async_trait]
impl RestApi for InMemoryApi {
    async fn unread_count(&self) -> SyncResult<u64> {
        Ok(self.enter("unread_count").await?.unread_count)
    }

    async fn fetch_notifications(
        &self,
        filter: NotificationFilter,
    ) -> SyncResult<Vec<Notification>> {
        let state = self.enter("fetch_notifications").await?;
        let items = state.notifications.iter().filter(|n| match filter {
            NotificationFilter::All | NotificationFilter::Verified => true,
            NotificationFilter::Mentions => n.category == NotificationCategory::Mention,
        });
        Ok(items.cloned().collect())
    }

    async fn mark_notification_read(&self, id: i64) -> SyncResult<()> {
        let mut state = self.enter("mark_notification_read").await?;
        let mut changed = false;
        if let Some(n) = state.notifications.iter_mut().find(|n| n.id == id) {
            changed = !n.is_read;
            n.is_read = true;
        }
        if changed {
            state.unread_count = state.unread_count.saturating_sub(1);
        }
        Ok(())
    }

    async fn mark_notification_unread(&self, id: i64) -> SyncResult<()> {
        let mut state = self.enter("mark_notification_unread").await?;
        let mut changed = false;
        if let Some(n) = state.notifications.iter_mut().find(|n| n.id == id) {
            changed = n.is_read;
            n.is_read = false;
        }
        if changed {
            state.unread_count += 1;
        }
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> SyncResult<()> {
        let mut state = self.enter("mark_all_notifications_read").await?;
        for n in state.notifications.iter_mut() {
            n.is_read = true;
        }
        state.unread_count = 0;
        Ok(())
    }

    async fn fetch_conversations(&self) -> SyncResult<Vec<Conversation>> {
        Ok(self.enter("fetch_conversations").await?.conversations.clone())
    }

    async fn fetch_messages(&self, conversation_id: i64) -> SyncResult<Vec<Message>> {
        let state = self.enter("fetch_messages").await?;
        state
            .messages
            .get(&conversation_id)
            .cloned()
            .ok_or_else(|| SyncError::Api(format!("conversation {} not found", conversation_id)))
    }

    async fn send_message(
        &self,
        conversation_id: i64,
        content: &MessageContent,
        client_id: &str,
    ) -> SyncResult<Message> {
        let mut state = self.enter("send_message").await?;
        if !state.messages.contains_key(&conversation_id) {
            return Err(SyncError::Api(format!(
                "conversation {} not found",
                conversation_id
            )));
        }
        let id = state.next_message_id;
        state.next_message_id += 1;
        let message = Message {
            id: MessageId::Server(id),
            conversation_id: Some(conversation_id),
            client_id: Some(client_id.to_string()),
            sender: state.me.clone(),
            content: content.clone(),
            timestamp: Utc::now(),
            is_read: false,
            status: DeliveryStatus::Confirmed,
        };
        if let Some(history) = state.messages.get_mut(&conversation_id) {
            history.push(message.clone());
        }
        Ok(message)
    }

    async fn mark_conversation_read(&self, conversation_id: i64) -> SyncResult<()> {
        let mut state = self.enter("mark_conversation_read").await?;
        if let Some(c) = state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            c.unread_count = 0;
        }
        Ok(())
    }

    async fn set_relation(&self, key: RelationKey, value: bool) -> SyncResult<()> {
        self.enter("set_relation").await?.relations.insert(key, value);
        Ok(())
    }

    async fn fetch_relation(&self, key: RelationKey) -> SyncResult<Option<bool>> {
        Ok(self.enter("fetch_relation").await?.relations.get(&key).copied())
    }
}
