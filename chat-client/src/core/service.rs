//! # Service Traits
//!
//! Seams between the chat controller and its two collaborators, the REST
//! backend and the push transport. Production code uses
//! [`crate::services::api::ApiClient`] and [`crate::transport::ChatSocket`];
//! tests inject in-memory implementations.

use async_trait::async_trait;
use shared::dto::chat::{Conversation, Message, UserSummary};
use shared::dto::events::{ClientCommand, CommandAck};

use super::error::Result;
use crate::transport::{ConnectionState, EventKind, Handler, HandlerId};

/// REST operations of the chat backend
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Full conversation list of the current user
    async fn list_chats(&self) -> Result<Vec<Conversation>>;

    /// Message history of one conversation, oldest first
    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>>;

    /// Idempotent get-or-create of the direct chat with `user_id`
    async fn get_or_create_direct(&self, user_id: &str) -> Result<Conversation>;

    /// Ask the backend to archive the conversation
    async fn delete_chat(&self, chat_id: &str) -> Result<()>;

    async fn mark_read(&self, chat_id: &str) -> Result<()>;

    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>>;
}

/// Persistent push connection with named-event subscription.
///
/// `request` awaits the acknowledgement matching the command's correlation
/// id; `emit` is fire-and-forget.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Establish the connection; a no-op while one is already running
    fn connect(&self, token: &str) -> Result<()>;

    fn disconnect(&self);

    fn on(&self, kind: EventKind, handler: Handler) -> HandlerId;

    fn off(&self, kind: EventKind, id: HandlerId) -> bool;

    fn connection_state(&self) -> ConnectionState;

    async fn request(&self, command: ClientCommand) -> Result<CommandAck>;

    fn emit(&self, command: ClientCommand);

    async fn join_chat(&self, chat_id: &str) -> Result<CommandAck> {
        self.request(ClientCommand::JoinChat { chat_id: chat_id.to_string() }).await
    }

    /// Best effort, no acknowledgement
    fn leave_chat(&self, chat_id: &str) {
        self.emit(ClientCommand::LeaveChat { chat_id: chat_id.to_string() });
    }

    async fn send_message(&self, chat_id: &str, content: &str) -> Result<CommandAck> {
        self.request(ClientCommand::SendMessage {
            chat_id: chat_id.to_string(),
            content: content.to_string(),
        })
        .await
    }

    fn start_typing(&self, chat_id: &str) {
        self.emit(ClientCommand::StartTyping { chat_id: chat_id.to_string() });
    }

    fn stop_typing(&self, chat_id: &str) {
        self.emit(ClientCommand::StopTyping { chat_id: chat_id.to_string() });
    }

    /// Read receipt for the other participants
    fn mark_read(&self, chat_id: &str) {
        self.emit(ClientCommand::MarkRead { chat_id: chat_id.to_string() });
    }
}
