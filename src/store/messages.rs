//! Conversations, the active conversation's messages and the typing indicator.
//!
//! Messages for the active conversation live in two arrays: `history` (REST) and
//! `realtime` (socket pushes and optimistic sends). [`MessagesSlice::merged`] is
//! what views render; it drops repeated ids so a message that arrives both ways
//! appears once.

use std::collections::HashSet;

use crate::models::{Conversation, DeliveryStatus, Message, MessageId, UserSummary};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagesSlice {
    pub conversations: Vec<Conversation>,
    pub active: Option<Conversation>,
    pub history: Vec<Message>,
    pub realtime: Vec<Message>,
    pub typing: Option<UserSummary>,
}

impl MessagesSlice {
    pub fn set_conversations(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
    }

    /// Replace a listed conversation, or list it first.
    pub fn upsert_conversation(&mut self, conversation: Conversation) {
        match self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation.id)
        {
            Some(existing) => *existing = conversation,
            None => self.conversations.insert(0, conversation),
        }
    }

    pub fn remove_conversation(&mut self, id: i64) {
        self.conversations.retain(|c| c.id != id);
    }

    /// Switch conversations. Drops the previous conversation's messages.
    pub fn set_active(&mut self, conversation: Option<Conversation>) {
        self.active = conversation;
        self.history.clear();
        self.realtime.clear();
        self.typing = None;
    }

    pub fn active_id(&self) -> Option<i64> {
        self.active.as_ref().map(|c| c.id)
    }

    pub fn set_history(&mut self, messages: Vec<Message>) {
        self.history = messages;
    }

    /// A chat channel only feeds the conversation with the user it is named after.
    fn belongs_to_active(&self, peer: &str, message: &Message) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        if active.user.username != peer {
            return false;
        }
        message.conversation_id.map_or(true, |id| id == active.id)
    }

    /// Add a message pushed on the chat channel with `peer`. A message echoing a
    /// pending temp id confirms it in place; a repeated id replaces the earlier
    /// copy. Returns `false` when the message is not for the active conversation.
    pub fn add_realtime(&mut self, peer: &str, mut message: Message) -> bool {
        if !self.belongs_to_active(peer, &message) {
            return false;
        }
        message.status = DeliveryStatus::Confirmed;
        self.touch_last_message(&message);

        let echoed = self
            .realtime
            .iter()
            .find(|m| message.confirms(&m.id))
            .map(|m| m.id.clone());
        if let Some(temp) = echoed {
            self.confirm_pending(&temp, message);
            return true;
        }
        match self.realtime.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => self.realtime.push(message),
        }
        true
    }

    /// Append an optimistic outgoing message.
    pub fn add_pending(&mut self, message: Message) {
        self.realtime.push(message);
    }

    /// Swap the pending `temp` message for the server copy. If the server copy
    /// is already present, the pending entry is removed instead.
    pub fn confirm_pending(&mut self, temp: &MessageId, mut confirmed: Message) -> bool {
        let Some(index) = self.realtime.iter().position(|m| &m.id == temp) else {
            return false;
        };
        confirmed.status = DeliveryStatus::Confirmed;
        let already_present = self
            .history
            .iter()
            .chain(self.realtime.iter())
            .any(|m| m.id == confirmed.id);
        if already_present {
            self.realtime.remove(index);
        } else {
            self.touch_last_message(&confirmed);
            self.realtime[index] = confirmed;
        }
        true
    }

    pub fn fail_pending(&mut self, temp: &MessageId) -> bool {
        match self.realtime.iter_mut().find(|m| &m.id == temp) {
            Some(m) => {
                m.status = DeliveryStatus::Failed;
                true
            }
            None => false,
        }
    }

    /// History then real-time, first occurrence of each id wins.
    pub fn merged(&self) -> Vec<Message> {
        let mut seen = HashSet::new();
        self.history
            .iter()
            .chain(self.realtime.iter())
            .filter(|m| seen.insert(m.id.clone()))
            .cloned()
            .collect()
    }

    /// Zero the unread badge and mark the other participant's messages read.
    pub fn mark_conversation_read(&mut self, id: i64) {
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) else {
            return;
        };
        conversation.unread_count = 0;
        let other = conversation.user.id;
        if self.active_id() == Some(id) {
            for m in self.history.iter_mut().chain(self.realtime.iter_mut()) {
                if m.sender.id == other {
                    m.is_read = true;
                }
            }
        }
    }

    pub fn set_typing(&mut self, user: Option<UserSummary>) {
        self.typing = user;
    }

    fn touch_last_message(&mut self, message: &Message) {
        let Some(active) = self.active_id() else {
            return;
        };
        if let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == active) {
            conversation.last_message = Some(message.clone());
        }
    }
}
