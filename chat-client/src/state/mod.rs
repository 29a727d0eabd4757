//! # Chat State
//!
//! Plain, synchronous state owned by the controller behind
//! `Arc<RwLock<ChatState>>`. Nothing in here performs I/O; the controller
//! applies push events and REST results and publishes the resulting updates.
//!
//! - **[`conversations`]**: keyed conversation list with patch operations
//! - **[`active`]**: open conversation, single-flight selection
//! - **[`presence`]**: online/offline map
//! - **[`typing`]**: remote typing indicators with expiry
//! - **[`debounce`]**: local typing signals
//! - **[`search`]**: user search results

pub mod active;
pub mod conversations;
pub mod debounce;
pub mod presence;
pub mod search;
pub mod typing;

pub use active::ActiveConversation;
pub use conversations::{ConversationList, MessagePatch};
pub use debounce::TypingDebouncer;
pub use presence::PresenceMap;
pub use search::UserSearch;
pub use typing::TypingTracker;

use shared::dto::chat::UserId;
use tokio::time::Instant;

use crate::config::ClientConfig;
use crate::transport::ConnectionState;

/// Everything the chat UI renders
#[derive(Debug, Clone)]
pub struct ChatState {
    /// Local user
    pub me: UserId,
    pub conversations: ConversationList,
    pub active: ActiveConversation,
    pub presence: PresenceMap,
    /// Remote users typing
    pub typing: TypingTracker,
    /// Our own typing signals
    pub typing_out: TypingDebouncer,
    pub search: UserSearch,
    pub connection: ConnectionState,
    /// Last user-visible failure
    pub last_error: Option<String>,
}

impl ChatState {
    pub fn new(me: impl Into<UserId>, config: &ClientConfig) -> Self {
        Self {
            me: me.into(),
            conversations: ConversationList::new(),
            active: ActiveConversation::new(),
            presence: PresenceMap::new(),
            typing: TypingTracker::new(config.typing_idle),
            typing_out: TypingDebouncer::new(config.typing_idle),
            search: UserSearch::new(config.search_min_chars),
            connection: ConnectionState::Disconnected,
            last_error: None,
        }
    }

    /// Remote users typing in the open conversation
    pub fn active_typing_users(&self, now: Instant) -> Vec<UserId> {
        let Some(chat_id) = self.active.chat_id() else {
            return Vec::new();
        };
        self.typing
            .users(chat_id, now)
            .into_iter()
            .filter(|user| *user != self.me)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_typing_excludes_me_and_other_chats() {
        let mut state = ChatState::new("me", &ClientConfig::default());
        let now = Instant::now();
        assert!(state.active_typing_users(now).is_empty());

        state.active.begin_select("c1", vec![]);
        state.typing.start("c1", "me", now);
        state.typing.start("c1", "u2", now);
        state.typing.start("c2", "u3", now);

        assert_eq!(state.active_typing_users(now), vec!["u2".to_string()]);
    }
}
