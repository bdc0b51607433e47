//! Operations the sync layer needs from the REST backend.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::models::{
    Conversation, Message, MessageContent, Notification, NotificationFilter, RelationKey,
};

/// Request/response calls made by the client facade and the optimistic coordinator.
/// Implementations map HTTP failures to [`crate::error::SyncError::Api`] and a
/// missing session to [`crate::error::SyncError::Unauthenticated`].
#[async_trait]
pub trait RestApi: Send + Sync {
    async fn unread_count(&self) -> SyncResult<u64>;

    async fn fetch_notifications(&self, filter: NotificationFilter)
        -> SyncResult<Vec<Notification>>;

    async fn mark_notification_read(&self, id: i64) -> SyncResult<()>;

    async fn mark_notification_unread(&self, id: i64) -> SyncResult<()>;

    async fn mark_all_notifications_read(&self) -> SyncResult<()>;

    async fn fetch_conversations(&self) -> SyncResult<Vec<Conversation>>;

    async fn fetch_messages(&self, conversation_id: i64) -> SyncResult<Vec<Message>>;

    /// Persist a message. `client_id` is the temp id the server echoes back.
    async fn send_message(
        &self,
        conversation_id: i64,
        content: &MessageContent,
        client_id: &str,
    ) -> SyncResult<Message>;

    async fn mark_conversation_read(&self, conversation_id: i64) -> SyncResult<()>;

    async fn set_relation(&self, key: RelationKey, value: bool) -> SyncResult<()>;

    /// Authoritative value; `None` when the server has no record.
    async fn fetch_relation(&self, key: RelationKey) -> SyncResult<Option<bool>>;
}
