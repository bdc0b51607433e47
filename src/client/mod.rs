//! View-facing facade. Screens call these methods and read the [`Store`]; they
//! never touch sockets or REST calls directly.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::AuthToken;
use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::models::{
    Channel, Conversation, Message, MessageContent, NotificationFilter, OutboundFrame,
    RelationKey, UserSummary,
};
use crate::repositories::RestApi;
use crate::services::{
    ChannelHandle, ConnectionManager, Dispatcher, MutationOutcome, OptimisticCoordinator,
};
use crate::store::Store;
use crate::transport::Connector;

#[derive(Clone)]
pub struct SyncClient {
    store: Store,
    api: Arc<dyn RestApi>,
    connections: ConnectionManager,
    optimistic: OptimisticCoordinator,
    me: UserSummary,
}

impl SyncClient {
    /// `me` authors optimistic messages until the server copy replaces them.
    pub fn new(
        config: &Config,
        connector: Arc<dyn Connector>,
        api: Arc<dyn RestApi>,
        me: UserSummary,
    ) -> Self {
        let store = Store::new(config.stream_chat_capacity);
        let connections = ConnectionManager::new(config, connector, Dispatcher::new(store.clone()));
        let optimistic = OptimisticCoordinator::new(store.clone(), api.clone());
        Self {
            store,
            api,
            connections,
            optimistic,
            me,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Channels opened afterwards use the new token.
    pub fn set_auth_token(&mut self, token: Option<AuthToken>) {
        self.connections.set_auth_token(token);
    }

    // --- notifications ---

    /// Hydrate the unread badge over REST, then follow it live.
    #[instrument(skip(self))]
    pub async fn open_notifications(&self) -> Option<ChannelHandle> {
        let handle = self.connections.open(Channel::Notifications)?;
        match self.api.unread_count().await {
            Ok(count) => self.store.set_unread_count(count).await,
            Err(e) => warn!(error = %e, "unread count hydration failed"),
        }
        Some(handle)
    }

    #[instrument(skip(self))]
    pub async fn refresh_notifications(&self, filter: NotificationFilter) -> SyncResult<()> {
        let items = self.api.fetch_notifications(filter).await?;
        self.store.set_notifications(filter, items).await;
        Ok(())
    }

    /// Optimistic on the loaded list; the request is sent even when `id` is not
    /// loaded. A failure restores the exact prior state and shows a transient error.
    #[instrument(skip(self))]
    pub async fn mark_notification_read(&self, id: i64) -> SyncResult<()> {
        let snapshot = self.store.mark_notification_read(id).await;
        if let Err(e) = self.api.mark_notification_read(id).await {
            self.store.restore_notification_read(snapshot).await;
            self.store.push_error(None, e.user_message()).await;
            return Err(e);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn mark_notification_unread(&self, id: i64) -> SyncResult<()> {
        let snapshot = self.store.mark_notification_unread(id).await;
        if let Err(e) = self.api.mark_notification_unread(id).await {
            self.store.restore_notification_read(snapshot).await;
            self.store.push_error(None, e.user_message()).await;
            return Err(e);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn mark_all_notifications_read(&self) -> SyncResult<()> {
        let (ids, previous) = self.store.mark_all_notifications_read().await;
        if let Err(e) = self.api.mark_all_notifications_read().await {
            self.store.restore_unread_notifications(ids, previous).await;
            self.store.push_error(None, e.user_message()).await;
            return Err(e);
        }
        Ok(())
    }

    // --- conversations ---

    #[instrument(skip(self))]
    pub async fn refresh_conversations(&self) -> SyncResult<()> {
        let conversations = self.api.fetch_conversations().await?;
        self.store.set_conversations(conversations).await;
        Ok(())
    }

    /// Make `conversation` active, connect its chat channel and load history.
    /// History failures become a transient error; the live channel stays open.
    #[instrument(skip(self, conversation), fields(conversation_id = conversation.id))]
    pub async fn enter_conversation(&self, conversation: Conversation) -> Option<ChannelHandle> {
        let id = conversation.id;
        let channel = Channel::chat(conversation.user.username.clone());
        self.store.set_active_conversation(Some(conversation)).await;
        let handle = self.connections.open(channel);

        match self.api.fetch_messages(id).await {
            Ok(history) => {
                if !self.store.set_conversation_messages(id, history).await {
                    info!("history arrived after leaving conversation");
                }
            }
            Err(e) => {
                warn!(error = %e, "history fetch failed");
                self.store.push_error(None, e.user_message()).await;
            }
        }

        self.store.mark_conversation_read(id).await;
        if let Err(e) = self.api.mark_conversation_read(id).await {
            warn!(error = %e, "mark conversation read failed");
        }
        handle
    }

    pub async fn leave_conversation(&self, handle: Option<ChannelHandle>) {
        if let Some(handle) = handle {
            handle.close().await;
        }
        self.store.set_active_conversation(None).await;
    }

    /// Show the message at once under a temp id, then swap in the server copy.
    #[instrument(skip(self, content))]
    pub async fn send_message(&self, content: impl Into<MessageContent>) -> SyncResult<Message> {
        let content = content.into();
        if content.is_blank() {
            return Err(SyncError::Validation("message is empty".to_string()));
        }
        let conversation = self
            .store
            .active_conversation()
            .await
            .ok_or_else(|| SyncError::Validation("no active conversation".to_string()))?;

        let pending = Message::pending(Some(conversation.id), self.me.clone(), content.clone());
        let temp = pending.id.clone();
        self.store.add_pending_message(pending).await;

        match self
            .api
            .send_message(conversation.id, &content, &temp.to_string())
            .await
        {
            Ok(message) => {
                self.store
                    .confirm_pending_message(&temp, message.clone())
                    .await;
                Ok(message)
            }
            Err(e) => {
                warn!(error = %e, temp_id = %temp, "send failed");
                self.store.fail_pending_message(&temp).await;
                self.store.push_error(None, e.user_message()).await;
                Err(e)
            }
        }
    }

    // --- live streams ---

    pub fn open_stream(&self, stream_id: u64) -> Option<ChannelHandle> {
        self.connections.open(Channel::stream(stream_id))
    }

    /// Close the stream channel and forget its viewer count, status and chat.
    pub async fn close_stream(&self, handle: ChannelHandle) {
        let stream_id = match handle.channel() {
            Channel::Stream { stream_id } => Some(*stream_id),
            _ => None,
        };
        handle.close().await;
        if let Some(stream_id) = stream_id {
            self.store.remove_stream(stream_id).await;
        }
    }

    pub async fn send_stream_chat(&self, handle: &ChannelHandle, text: &str) -> SyncResult<()> {
        if !matches!(handle.channel(), Channel::Stream { .. }) {
            return Err(SyncError::InvalidChannel(handle.channel().to_string()));
        }
        let frame = OutboundFrame::chat(text)?;
        handle.send(&frame).await
    }

    // --- relations ---

    pub async fn set_follow(&self, user_id: i64, following: bool) -> MutationOutcome {
        self.optimistic
            .mutate(RelationKey::Follow { user_id }, following)
            .await
    }

    pub async fn set_community_membership(&self, community_id: i64, member: bool) -> MutationOutcome {
        self.optimistic
            .mutate(RelationKey::CommunityMembership { community_id }, member)
            .await
    }

    pub async fn set_list_membership(&self, list_id: i64, user_id: i64, member: bool) -> MutationOutcome {
        self.optimistic
            .mutate(RelationKey::ListMembership { list_id, user_id }, member)
            .await
    }

    pub async fn dismiss_error(&self, id: Uuid) -> bool {
        self.store.dismiss_error(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryStatus, MessageId, Notification, NotificationCategory};
    use crate::repositories::InMemoryApi;
    use crate::transport::MemoryConnector;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    struct Harness {
        client: SyncClient,
        api: Arc<InMemoryApi>,
        connector: Arc<MemoryConnector>,
    }

    fn harness() -> Harness {
        let config = Config {
            ws_base_url: "ws://test/ws".into(),
            auth_token: Some(AuthToken::new("tok")),
            ..Config::default()
        };
        let api = Arc::new(InMemoryApi::new(UserSummary::new(Some(1), "me")));
        let connector = Arc::new(MemoryConnector::new());
        let client = SyncClient::new(
            &config,
            connector.clone(),
            api.clone(),
            UserSummary::new(Some(1), "me"),
        );
        Harness {
            client,
            api,
            connector,
        }
    }

    fn alice() -> Conversation {
        Conversation {
            id: 10,
            user: UserSummary::new(Some(2), "alice"),
            unread_count: 2,
            last_message: None,
        }
    }

    fn from_alice(id: i64) -> Message {
        Message {
            id: MessageId::Server(id),
            conversation_id: Some(10),
            client_id: None,
            sender: UserSummary::new(Some(2), "alice"),
            content: format!("m{}", id).as_str().into(),
            timestamp: Utc::now(),
            is_read: false,
            status: DeliveryStatus::Confirmed,
        }
    }

    fn ids(messages: &[Message]) -> Vec<MessageId> {
        messages.iter().map(|m| m.id.clone()).collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn history_realtime_and_optimistic_send_merge_in_order() {
        let h = harness();
        h.api
            .add_conversation(alice(), vec![from_alice(1), from_alice(2), from_alice(3)])
            .await;

        let handle = h.client.enter_conversation(alice()).await.unwrap();
        let remote = h.connector.accept().await.unwrap();
        assert_eq!(remote.url, "ws://test/ws/chat/alice/?token=tok");

        let four = h.api.reserve_message_id().await;
        remote.push_json(&json!({ "type": "message", "message": from_alice(four) }));
        settle().await;
        // id 5 went to some other conversation
        h.api.reserve_message_id().await;

        let sent = h.client.send_message("hey").await.unwrap();
        assert_eq!(sent.id, MessageId::Server(6));

        let mut echo = sent.clone();
        echo.sender = UserSummary::new(Some(1), "me");
        remote.push_json(&json!({ "type": "message", "message": echo }));
        settle().await;

        let rendered = h.client.store().conversation_messages().await;
        assert_eq!(
            ids(&rendered),
            [1, 2, 3, 4, 6].map(MessageId::Server).to_vec()
        );
        assert!(rendered.iter().all(|m| !m.is_pending()));
        h.client.leave_conversation(Some(handle)).await;
        assert!(h.client.store().conversation_messages().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_chat_channel_does_not_feed_the_next_conversation() {
        let h = harness();
        let bob = Conversation {
            id: 11,
            user: UserSummary::new(Some(3), "bob"),
            unread_count: 0,
            last_message: None,
        };
        h.api.add_conversation(alice(), vec![]).await;
        h.api.add_conversation(bob.clone(), vec![]).await;

        let _alice_handle = h.client.enter_conversation(alice()).await.unwrap();
        let alice_remote = h.connector.accept().await.unwrap();
        let _bob_handle = h.client.enter_conversation(bob).await.unwrap();
        let _bob_remote = h.connector.accept().await.unwrap();

        let mut stray = from_alice(7);
        stray.conversation_id = None;
        alice_remote.push_json(&json!({ "type": "message", "message": stray }));
        settle().await;
        assert!(h.client.store().conversation_messages().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_keeps_message_marked_failed() {
        let h = harness();
        h.api.add_conversation(alice(), vec![from_alice(1)]).await;
        let _handle = h.client.enter_conversation(alice()).await;
        h.api.fail("send_message").await;

        assert_err!(h.client.send_message("hey").await);
        let rendered = h.client.store().conversation_messages().await;
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[1].status, DeliveryStatus::Failed);
        assert!(rendered[1].id.is_temp());
        assert_eq!(h.client.store().errors().await.len(), 1);
    }

    #[tokio::test]
    async fn blank_message_or_no_conversation_is_rejected() {
        let h = harness();
        assert!(matches!(
            h.client.send_message("   ").await,
            Err(SyncError::Validation(_))
        ));
        assert!(matches!(
            h.client.send_message("hi").await,
            Err(SyncError::Validation(_))
        ));
        assert!(h.api.calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entering_conversation_clears_badge() {
        let h = harness();
        h.api.add_conversation(alice(), vec![from_alice(1)]).await;
        h.client.refresh_conversations().await.unwrap();
        let _handle = h.client.enter_conversation(alice()).await;
        let conversations = h.client.store().conversations().await;
        assert_eq!(conversations[0].unread_count, 0);
        assert!(h.client.store().conversation_messages().await[0].is_read);
    }

    #[tokio::test(start_paused = true)]
    async fn open_notifications_hydrates_then_follows_pushes() {
        let h = harness();
        h.api.set_unread_count(4).await;
        let handle = h.client.open_notifications().await.unwrap();
        let remote = h.connector.accept().await.unwrap();
        assert_eq!(h.client.store().unread_count().await, 4);

        remote.push_json(&json!({ "type": "new_notification" }));
        settle().await;
        assert_eq!(h.client.store().unread_count().await, 5);
        handle.close().await;
    }

    #[tokio::test]
    async fn mark_read_rolls_back_on_failure() {
        let h = harness();
        let items = vec![
            Notification {
                id: 1,
                category: NotificationCategory::Mention,
                actor: None,
                text: None,
                is_read: false,
                timestamp: Utc::now(),
            },
            Notification {
                id: 2,
                category: NotificationCategory::Like,
                actor: None,
                text: None,
                is_read: false,
                timestamp: Utc::now(),
            },
        ];
        h.api.set_notifications(items).await;
        h.api.set_unread_count(2).await;
        h.client
            .refresh_notifications(NotificationFilter::All)
            .await
            .unwrap();
        h.client.store().set_unread_count(2).await;
        let before = h.client.store().snapshot().await.notifications;

        h.api.fail("mark_notification_read").await;
        assert_err!(h.client.mark_notification_read(1).await);
        assert_eq!(h.client.store().snapshot().await.notifications, before);

        h.api.fail("mark_all_notifications_read").await;
        assert_err!(h.client.mark_all_notifications_read().await);
        assert_eq!(h.client.store().snapshot().await.notifications, before);
        assert_eq!(h.client.store().errors().await.len(), 2);

        h.api.recover("mark_notification_read").await;
        assert_ok!(h.client.mark_notification_read(1).await);
        assert_eq!(h.client.store().unread_count().await, 1);
    }

    #[tokio::test]
    async fn mark_read_rollback_is_exact_when_counter_is_zero() {
        let h = harness();
        h.api
            .set_notifications(vec![Notification {
                id: 1,
                category: NotificationCategory::Like,
                actor: None,
                text: None,
                is_read: false,
                timestamp: Utc::now(),
            }])
            .await;
        h.client
            .refresh_notifications(NotificationFilter::All)
            .await
            .unwrap();
        assert_eq!(h.client.store().unread_count().await, 0);
        let before = h.client.store().snapshot().await.notifications;

        h.api.fail("mark_notification_read").await;
        assert_err!(h.client.mark_notification_read(1).await);
        assert_eq!(h.client.store().snapshot().await.notifications, before);
        assert_eq!(h.client.store().unread_count().await, 0);
    }

    #[tokio::test]
    async fn marking_an_unloaded_notification_still_reaches_the_server() {
        let h = harness();
        h.client.store().set_unread_count(3).await;
        assert_ok!(h.client.mark_notification_read(42).await);
        assert_ok!(h.client.mark_notification_unread(42).await);
        assert_eq!(
            h.api.calls().await,
            vec!["mark_notification_read", "mark_notification_unread"]
        );
        assert_eq!(h.client.store().unread_count().await, 3);
        assert!(h.client.store().notifications().await.is_empty());
    }

    #[tokio::test]
    async fn mentions_filter_is_applied() {
        let h = harness();
        h.api
            .set_notifications(vec![Notification {
                id: 1,
                category: NotificationCategory::Like,
                actor: None,
                text: None,
                is_read: false,
                timestamp: Utc::now(),
            }])
            .await;
        h.client
            .refresh_notifications(NotificationFilter::Mentions)
            .await
            .unwrap();
        assert!(h.client.store().notifications().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_chat_goes_out_validated() {
        let h = harness();
        let handle = h.client.open_stream(12).unwrap();
        let mut remote = h.connector.accept().await.unwrap();
        assert!(handle.wait_connected().await);

        assert!(matches!(
            h.client.send_stream_chat(&handle, "  ").await,
            Err(SyncError::Validation(_))
        ));
        h.client.send_stream_chat(&handle, " goal! ").await.unwrap();
        let frame: serde_json::Value =
            serde_json::from_str(&remote.next_frame().await.unwrap()).unwrap();
        assert_eq!(frame, json!({ "type": "chat_message", "content": "goal!" }));

        remote.push_json(&json!({ "type": "viewer_count_update", "viewer_count": 12 }));
        settle().await;
        assert_eq!(h.client.store().viewer_count(12).await, 12);

        h.client.close_stream(handle).await;
        assert!(h.client.store().live_stream(12).await.is_none());
    }

    #[tokio::test]
    async fn follow_failure_surfaces_dismissible_error() {
        let h = harness();
        h.api.fail("set_relation").await;
        let outcome = h.client.set_follow(3, true).await;
        let MutationOutcome::RolledBack { error_id, .. } = outcome else {
            panic!("expected rollback");
        };
        assert_eq!(h.client.store().relation(RelationKey::Follow { user_id: 3 }).await, None);
        assert!(h.client.dismiss_error(error_id).await);
        assert!(h.client.store().errors().await.is_empty());

        h.api.recover("set_relation").await;
        assert!(h.client.set_community_membership(8, true).await.is_confirmed());
        assert!(h.client.set_list_membership(2, 3, true).await.is_confirmed());
    }

    #[tokio::test]
    async fn no_token_means_no_channels() {
        let mut h = harness();
        h.client.set_auth_token(None);
        assert!(h.client.open_notifications().await.is_none());
        assert!(h.client.open_stream(1).is_none());
        assert_eq!(h.connector.attempts().await, 0);
    }
}
