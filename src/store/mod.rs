//! Client state store: one lock-guarded state, written only through the named
//! action methods on [`Store`], read through selector methods returning clones.
//!
//! Every action bumps a revision published on a `watch` channel; views subscribe
//! to it to know when to re-read.

pub mod live_stream;
pub mod messages;
pub mod notifications;
pub mod relations;

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::trace;
use uuid::Uuid;

use crate::models::{
    Conversation, LiveStream, Message, MessageId, Notification, NotificationFilter,
    RelationKey, StreamChatEntry, StreamStatus, StreamStatusEvent, UserSummary,
};

pub use live_stream::LiveStreamsSlice;
pub use messages::MessagesSlice;
pub use notifications::{NotificationsSlice, ReadSnapshot};
pub use relations::{RelationsSlice, TransientError};

#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    pub notifications: NotificationsSlice,
    pub messages: MessagesSlice,
    pub streams: LiveStreamsSlice,
    pub relations: RelationsSlice,
    pub errors: Vec<TransientError>,
}

impl StoreState {
    pub fn new(stream_chat_capacity: usize) -> Self {
        Self {
            notifications: NotificationsSlice::default(),
            messages: MessagesSlice::default(),
            streams: LiveStreamsSlice::new(stream_chat_capacity),
            relations: RelationsSlice::default(),
            errors: Vec::new(),
        }
    }
}

/// Shared handle to the client state. Cheap to clone; inject it where needed.
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<StoreState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Store {
    pub fn new(stream_chat_capacity: usize) -> Self {
        let (revision, _rx) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(StoreState::new(stream_chat_capacity))),
            revision: Arc::new(revision),
        }
    }

    /// Receiver that changes after every action.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Full copy of the current state.
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    async fn update<R>(&self, action: &'static str, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let result = {
            let mut state = self.state.write().await;
            f(&mut state)
        };
        self.revision.send_modify(|rev| *rev += 1);
        trace!(action, "store action applied");
        result
    }

    async fn select<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    // --- notifications ---

    pub async fn set_unread_count(&self, count: u64) {
        self.update("set_unread_count", |s| s.notifications.set_unread(count))
            .await
    }

    pub async fn increment_unread_count(&self) {
        self.update("increment_unread_count", |s| {
            s.notifications.increment_unread()
        })
        .await
    }

    pub async fn add_notification(&self, notification: Notification) {
        self.update("add_notification", |s| s.notifications.add(notification))
            .await
    }

    pub async fn set_notifications(&self, filter: NotificationFilter, items: Vec<Notification>) {
        self.update("set_notifications", |s| {
            s.notifications.set_items(filter, items)
        })
        .await
    }

    pub async fn mark_notification_read(&self, id: i64) -> ReadSnapshot {
        self.update("mark_notification_read", |s| s.notifications.mark_read(id))
            .await
    }

    pub async fn mark_notification_unread(&self, id: i64) -> ReadSnapshot {
        self.update("mark_notification_unread", |s| {
            s.notifications.mark_unread(id)
        })
        .await
    }

    /// Put back the read flag and unread count captured by a mark action.
    pub async fn restore_notification_read(&self, snapshot: ReadSnapshot) {
        self.update("restore_notification_read", |s| {
            s.notifications.restore_read(snapshot)
        })
        .await
    }

    /// Marks everything read; returns the ids that were unread and the previous count.
    pub async fn mark_all_notifications_read(&self) -> (Vec<i64>, u64) {
        self.update("mark_all_notifications_read", |s| {
            let unread: Vec<i64> = s
                .notifications
                .items
                .iter()
                .filter(|n| !n.is_read)
                .map(|n| n.id)
                .collect();
            let previous = s.notifications.unread_count;
            s.notifications.mark_all_read();
            (unread, previous)
        })
        .await
    }

    /// Undo [`Store::mark_all_notifications_read`].
    pub async fn restore_unread_notifications(&self, ids: Vec<i64>, count: u64) {
        self.update("restore_unread_notifications", |s| {
            for n in s.notifications.items.iter_mut() {
                if ids.contains(&n.id) {
                    n.is_read = false;
                }
            }
            s.notifications.set_unread(count);
        })
        .await
    }

    pub async fn unread_count(&self) -> u64 {
        self.select(|s| s.notifications.unread_count).await
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.select(|s| s.notifications.items.clone()).await
    }

    // --- messages ---

    pub async fn set_conversations(&self, conversations: Vec<Conversation>) {
        self.update("set_conversations", |s| {
            s.messages.set_conversations(conversations)
        })
        .await
    }

    pub async fn upsert_conversation(&self, conversation: Conversation) {
        self.update("upsert_conversation", |s| {
            s.messages.upsert_conversation(conversation)
        })
        .await
    }

    pub async fn remove_conversation(&self, id: i64) {
        self.update("remove_conversation", |s| s.messages.remove_conversation(id))
            .await
    }

    pub async fn set_active_conversation(&self, conversation: Option<Conversation>) {
        self.update("set_active_conversation", |s| {
            s.messages.set_active(conversation)
        })
        .await
    }

    /// History for `conversation_id`; ignored if the user has moved on.
    pub async fn set_conversation_messages(&self, conversation_id: i64, messages: Vec<Message>) -> bool {
        self.update("set_conversation_messages", |s| {
            if s.messages.active_id() != Some(conversation_id) {
                return false;
            }
            s.messages.set_history(messages);
            true
        })
        .await
    }

    /// Message pushed on the chat channel with `peer`.
    pub async fn add_realtime_message(&self, peer: &str, message: Message) -> bool {
        self.update("add_realtime_message", |s| {
            s.messages.add_realtime(peer, message)
        })
        .await
    }

    pub async fn add_pending_message(&self, message: Message) {
        self.update("add_pending_message", |s| s.messages.add_pending(message))
            .await
    }

    pub async fn confirm_pending_message(&self, temp: &MessageId, confirmed: Message) -> bool {
        self.update("confirm_pending_message", |s| {
            s.messages.confirm_pending(temp, confirmed)
        })
        .await
    }

    pub async fn fail_pending_message(&self, temp: &MessageId) -> bool {
        self.update("fail_pending_message", |s| s.messages.fail_pending(temp))
            .await
    }

    pub async fn mark_conversation_read(&self, id: i64) {
        self.update("mark_conversation_read", |s| {
            s.messages.mark_conversation_read(id)
        })
        .await
    }

    pub async fn set_typing(&self, user: Option<UserSummary>) {
        self.update("set_typing", |s| s.messages.set_typing(user))
            .await
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.select(|s| s.messages.conversations.clone()).await
    }

    pub async fn active_conversation(&self) -> Option<Conversation> {
        self.select(|s| s.messages.active.clone()).await
    }

    /// Rendered message list for the active conversation.
    pub async fn conversation_messages(&self) -> Vec<Message> {
        self.select(|s| s.messages.merged()).await
    }

    pub async fn typing_user(&self) -> Option<UserSummary> {
        self.select(|s| s.messages.typing.clone()).await
    }

    // --- live streams ---

    pub async fn set_viewer_count(&self, stream_id: u64, count: u64) {
        self.update("set_viewer_count", |s| {
            s.streams.set_viewer_count(stream_id, count)
        })
        .await
    }

    pub async fn update_stream_status(&self, stream_id: u64, event: StreamStatusEvent) {
        self.update("update_stream_status", |s| {
            s.streams.apply_status(stream_id, &event)
        })
        .await
    }

    pub async fn add_stream_chat(&self, stream_id: u64, entry: StreamChatEntry) {
        self.update("add_stream_chat", |s| s.streams.push_chat(stream_id, entry))
            .await
    }

    pub async fn clear_stream_chat(&self, stream_id: u64) {
        self.update("clear_stream_chat", |s| s.streams.clear_chat(stream_id))
            .await
    }

    pub async fn remove_stream(&self, stream_id: u64) {
        self.update("remove_stream", |s| s.streams.remove(stream_id))
            .await
    }

    pub async fn viewer_count(&self, stream_id: u64) -> u64 {
        self.select(|s| {
            s.streams
                .streams
                .get(&stream_id)
                .map(|l| l.viewer_count)
                .unwrap_or(0)
        })
        .await
    }

    pub async fn stream_status(&self, stream_id: u64) -> Option<StreamStatus> {
        self.select(|s| {
            s.streams
                .streams
                .get(&stream_id)
                .and_then(|l| l.status.clone())
        })
        .await
    }

    pub async fn stream_chat(&self, stream_id: u64) -> Vec<StreamChatEntry> {
        self.select(|s| {
            s.streams
                .streams
                .get(&stream_id)
                .map(|l| l.chat.iter().cloned().collect())
                .unwrap_or_default()
        })
        .await
    }

    pub async fn live_stream(&self, stream_id: u64) -> Option<LiveStream> {
        self.select(|s| s.streams.streams.get(&stream_id).cloned())
            .await
    }

    // --- relations ---

    /// Snapshot-and-apply in one step; returns the value visible before.
    pub async fn begin_mutation(&self, key: RelationKey, value: bool) -> Option<bool> {
        self.update("begin_mutation", |s| s.relations.begin(key, value))
            .await
    }

    pub async fn confirm_mutation(&self, key: RelationKey, authoritative: Option<bool>) {
        self.update("confirm_mutation", |s| {
            if let Some(value) = authoritative {
                s.relations.set(key, value);
            }
            s.relations.settle(&key);
        })
        .await
    }

    pub async fn rollback_mutation(
        &self,
        key: RelationKey,
        snapshot: Option<bool>,
        message: String,
    ) -> Uuid {
        self.update("rollback_mutation", |s| {
            s.relations.restore(key, snapshot);
            s.relations.settle(&key);
            let error = TransientError::new(Some(key), message);
            let id = error.id;
            s.errors.push(error);
            id
        })
        .await
    }

    pub async fn set_relation(&self, key: RelationKey, value: bool) {
        self.update("set_relation", |s| s.relations.set(key, value))
            .await
    }

    pub async fn relation(&self, key: RelationKey) -> Option<bool> {
        self.select(|s| s.relations.get(&key)).await
    }

    pub async fn is_mutation_pending(&self, key: RelationKey) -> bool {
        self.select(|s| s.relations.is_pending(&key)).await
    }

    // --- transient errors ---

    pub async fn push_error(&self, key: Option<RelationKey>, message: impl Into<String>) -> Uuid {
        let error = TransientError::new(key, message);
        let id = error.id;
        self.update("push_error", |s| s.errors.push(error)).await;
        id
    }

    pub async fn dismiss_error(&self, id: Uuid) -> bool {
        self.update("dismiss_error", |s| {
            let before = s.errors.len();
            s.errors.retain(|e| e.id != id);
            before != s.errors.len()
        })
        .await
    }

    pub async fn errors(&self) -> Vec<TransientError> {
        self.select(|s| s.errors.clone()).await
    }
}
