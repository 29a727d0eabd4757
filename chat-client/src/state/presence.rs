//! Online/offline map shared by every conversation.

use shared::dto::chat::{Conversation, UserId};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct PresenceMap {
    online: HashMap<UserId, bool>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take presence from a freshly fetched conversation list
    pub fn seed_from<'a>(&mut self, conversations: impl IntoIterator<Item = &'a Conversation>) {
        for conversation in conversations {
            for participant in &conversation.participants {
                self.online.insert(participant.id.clone(), participant.is_online);
            }
        }
    }

    /// Record a presence signal. Returns true when the value changed.
    pub fn set(&mut self, user_id: &str, online: bool) -> bool {
        match self.online.insert(user_id.to_string(), online) {
            Some(previous) => previous != online,
            None => true,
        }
    }

    /// Unknown users count as offline
    pub fn is_online(&self, user_id: &str) -> bool {
        self.online.get(user_id).copied().unwrap_or(false)
    }

    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .online
            .iter()
            .filter(|(_, online)| **online)
            .map(|(id, _)| id.clone())
            .collect();
        users.sort();
        users
    }
}
