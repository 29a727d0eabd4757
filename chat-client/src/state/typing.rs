//! # Typing Indicators (receiving side)
//!
//! Per conversation, the users currently typing. Each entry carries its own
//! deadline and disappears after the idle window unless refreshed by another
//! `typing:start`, so a lost `typing:stop` never leaves a stuck indicator.

use shared::dto::chat::{ConversationId, UserId};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct TypingTracker {
    idle: Duration,
    typing: HashMap<ConversationId, HashMap<UserId, Instant>>,
}

impl TypingTracker {
    pub fn new(idle: Duration) -> Self {
        Self { idle, typing: HashMap::new() }
    }

    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// Start or refresh an indicator. Returns true when it became visible.
    pub fn start(&mut self, chat_id: &str, user_id: &str, now: Instant) -> bool {
        let users = self.typing.entry(chat_id.to_string()).or_default();
        let previous = users.insert(user_id.to_string(), now + self.idle);
        !matches!(previous, Some(deadline) if deadline > now)
    }

    /// Returns true when an indicator was removed
    pub fn stop(&mut self, chat_id: &str, user_id: &str) -> bool {
        let Some(users) = self.typing.get_mut(chat_id) else {
            return false;
        };
        let removed = users.remove(user_id).is_some();
        if users.is_empty() {
            self.typing.remove(chat_id);
        }
        removed
    }

    /// Users typing in `chat_id`, sorted, ignoring expired entries
    pub fn users(&self, chat_id: &str, now: Instant) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .typing
            .get(chat_id)
            .map(|users| {
                users
                    .iter()
                    .filter(|(_, deadline)| **deadline > now)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();
        users.sort();
        users
    }

    pub fn is_typing(&self, chat_id: &str, user_id: &str, now: Instant) -> bool {
        self.typing
            .get(chat_id)
            .and_then(|users| users.get(user_id))
            .is_some_and(|deadline| *deadline > now)
    }

    /// Drop expired entries; returns the conversations whose set changed
    pub fn expire(&mut self, now: Instant) -> Vec<ConversationId> {
        let mut changed = BTreeSet::new();
        self.typing.retain(|chat_id, users| {
            let before = users.len();
            users.retain(|_, deadline| *deadline > now);
            if users.len() != before {
                changed.insert(chat_id.clone());
            }
            !users.is_empty()
        });
        changed.into_iter().collect()
    }

    pub fn clear_chat(&mut self, chat_id: &str) -> bool {
        self.typing.remove(chat_id).is_some()
    }

    /// Earliest pending expiry
    pub fn next_deadline(&self) -> Option<Instant> {
        self.typing.values().flat_map(|users| users.values()).min().copied()
    }
}
