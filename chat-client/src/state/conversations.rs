//! # Conversation List
//!
//! Conversations keyed by id. A full fetch replaces the map wholesale; push
//! events are applied as targeted patches. Display order is derived on
//! demand: most recent activity first.

use shared::dto::chat::{Conversation, ConversationId, LastMessage, Message};
use std::collections::HashMap;

/// Outcome of applying a pushed message to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePatch {
    /// Conversation not in the list; a refetch will pick it up
    Unknown,
    /// Message id already cached
    Duplicate,
    Applied,
}

#[derive(Debug, Default, Clone)]
pub struct ConversationList {
    chats: HashMap<ConversationId, Conversation>,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every conversation with a fresh fetch.
    ///
    /// List payloads come without messages, so already loaded histories are
    /// carried over.
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        let mut previous = std::mem::take(&mut self.chats);
        for mut conversation in conversations {
            if conversation.messages.is_empty() {
                if let Some(old) = previous.remove(&conversation.id) {
                    conversation.messages = old.messages;
                }
            }
            self.chats.insert(conversation.id.clone(), conversation);
        }
    }

    pub fn upsert(&mut self, mut conversation: Conversation) {
        if conversation.messages.is_empty() {
            if let Some(old) = self.chats.get_mut(&conversation.id) {
                conversation.messages = std::mem::take(&mut old.messages);
            }
        }
        self.chats.insert(conversation.id.clone(), conversation);
    }

    pub fn remove(&mut self, chat_id: &str) -> Option<Conversation> {
        self.chats.remove(chat_id)
    }

    pub fn get(&self, chat_id: &str) -> Option<&Conversation> {
        self.chats.get(chat_id)
    }

    pub fn contains(&self, chat_id: &str) -> bool {
        self.chats.contains_key(chat_id)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.chats.values()
    }

    /// Conversations for display, most recent activity first
    pub fn ordered(&self) -> Vec<Conversation> {
        let mut list: Vec<Conversation> = self.chats.values().cloned().collect();
        list.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// Patch the list with a pushed message.
    ///
    /// Updates the last-message preview, caches the message, and bumps
    /// `me`'s unread counter unless `me` sent it or the conversation is open.
    pub fn apply_message(&mut self, chat_id: &str, message: &Message, me: &str, active: bool) -> MessagePatch {
        let Some(conversation) = self.chats.get_mut(chat_id) else {
            return MessagePatch::Unknown;
        };
        if conversation.messages.iter().any(|m| m.id == message.id) {
            return MessagePatch::Duplicate;
        }

        conversation.messages.push(message.clone());
        conversation.last_message = Some(LastMessage::from(message));
        conversation.updated_at = Some(
            conversation
                .updated_at
                .map_or(message.timestamp, |updated| updated.max(message.timestamp)),
        );

        if message.sender_id != me && !active {
            *conversation.unread_count.entry(me.to_string()).or_insert(0) += 1;
        }
        MessagePatch::Applied
    }

    /// Reset `user_id`'s unread counter. Returns true when it was non-zero.
    pub fn mark_read(&mut self, chat_id: &str, user_id: &str) -> bool {
        let Some(conversation) = self.chats.get_mut(chat_id) else {
            return false;
        };
        match conversation.unread_count.get_mut(user_id) {
            Some(count) if *count > 0 => {
                *count = 0;
                true
            }
            _ => false,
        }
    }

    /// Update a participant's online flag everywhere; returns touched ids
    pub fn set_presence(&mut self, user_id: &str, online: bool) -> Vec<ConversationId> {
        let mut touched = Vec::new();
        for conversation in self.chats.values_mut() {
            for participant in conversation.participants.iter_mut() {
                if participant.id == user_id && participant.is_online != online {
                    participant.is_online = online;
                    touched.push(conversation.id.clone());
                }
            }
        }
        touched.sort();
        touched
    }

    pub fn set_messages(&mut self, chat_id: &str, messages: Vec<Message>) -> bool {
        match self.chats.get_mut(chat_id) {
            Some(conversation) => {
                conversation.messages = messages;
                true
            }
            None => false,
        }
    }

    pub fn total_unread(&self, user_id: &str) -> u32 {
        self.chats.values().map(|c| c.unread_for(user_id)).sum()
    }
}
