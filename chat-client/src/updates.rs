//! # Chat Updates
//!
//! Notifications published by [`crate::controller::ChatController`] on a
//! broadcast channel. They carry just enough to let a UI decide what to
//! re-render; the full data is read back from the controller's snapshots.

use shared::dto::chat::{ConversationId, UserId, UserSummary};

use crate::transport::ConnectionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    /// Conversation list changed (order, previews, unread counters)
    ConversationsChanged,
    /// Message sequence of a conversation changed
    MessagesChanged {
        chat_id: ConversationId,
        /// Render, then scroll the message list to the bottom
        scroll_to_bottom: bool,
    },
    /// Typing set of a conversation changed
    TypingChanged { chat_id: ConversationId, users: Vec<UserId> },
    PresenceChanged { user_id: UserId, online: bool },
    ConnectionChanged(ConnectionState),
    /// Results for the latest search query
    SearchResults(Vec<UserSummary>),
    /// User-visible failure
    Error(String),
}

impl ChatUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            ChatUpdate::ConversationsChanged => "conversations_changed",
            ChatUpdate::MessagesChanged { .. } => "messages_changed",
            ChatUpdate::TypingChanged { .. } => "typing_changed",
            ChatUpdate::PresenceChanged { .. } => "presence_changed",
            ChatUpdate::ConnectionChanged(_) => "connection_changed",
            ChatUpdate::SearchResults(_) => "search_results",
            ChatUpdate::Error(_) => "error",
        }
    }
}
