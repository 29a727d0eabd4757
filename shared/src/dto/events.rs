//! # Push Transport Frames
//!
//! JSON frames exchanged over the chat WebSocket.
//!
//! ```text
//! server → client   {"event":"message:new","data":{"chat_id":"c1","message":{...}}}
//! client → server   {"ref":"<uuid>","event":"message:send","data":{"chat_id":"c1","content":"hi"}}
//! server → client   {"event":"ack","data":{"ref":"<uuid>","ok":true}}
//! ```

use serde::{Deserialize, Serialize};

use super::chat::{ConversationId, Message, UserId};

/// Server-initiated event delivered over the push transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    MessageNew(NewMessage),
    #[serde(rename = "typing:start")]
    TypingStart(TypingSignal),
    #[serde(rename = "typing:stop")]
    TypingStop(TypingSignal),
    #[serde(rename = "user:online")]
    UserOnline(PresenceSignal),
    #[serde(rename = "user:offline")]
    UserOffline(PresenceSignal),
    #[serde(rename = "messages:read")]
    MessagesRead(ReadReceipt),
    #[serde(rename = "ack")]
    Ack(CommandAck),
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::MessageNew(_) => "message:new",
            ServerEvent::TypingStart(_) => "typing:start",
            ServerEvent::TypingStop(_) => "typing:stop",
            ServerEvent::UserOnline(_) => "user:online",
            ServerEvent::UserOffline(_) => "user:offline",
            ServerEvent::MessagesRead(_) => "messages:read",
            ServerEvent::Ack(_) => "ack",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: ConversationId,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingSignal {
    pub chat_id: ConversationId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceSignal {
    pub user_id: UserId,
}

/// `user_id` has read every message of `chat_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadReceipt {
    pub chat_id: ConversationId,
    pub user_id: UserId,
}

/// Acknowledgement of a client command, matched by correlation id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandAck {
    #[serde(rename = "ref")]
    pub reference: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stored message, for `message:send` acks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// Client → server action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientCommand {
    #[serde(rename = "chat:join")]
    JoinChat { chat_id: ConversationId },
    #[serde(rename = "chat:leave")]
    LeaveChat { chat_id: ConversationId },
    #[serde(rename = "message:send")]
    SendMessage { chat_id: ConversationId, content: String },
    #[serde(rename = "typing:start")]
    StartTyping { chat_id: ConversationId },
    #[serde(rename = "typing:stop")]
    StopTyping { chat_id: ConversationId },
    #[serde(rename = "messages:read")]
    MarkRead { chat_id: ConversationId },
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::JoinChat { .. } => "chat:join",
            ClientCommand::LeaveChat { .. } => "chat:leave",
            ClientCommand::SendMessage { .. } => "message:send",
            ClientCommand::StartTyping { .. } => "typing:start",
            ClientCommand::StopTyping { .. } => "typing:stop",
            ClientCommand::MarkRead { .. } => "messages:read",
        }
    }

    pub fn chat_id(&self) -> &str {
        match self {
            ClientCommand::JoinChat { chat_id }
            | ClientCommand::LeaveChat { chat_id }
            | ClientCommand::SendMessage { chat_id, .. }
            | ClientCommand::StartTyping { chat_id }
            | ClientCommand::StopTyping { chat_id }
            | ClientCommand::MarkRead { chat_id } => chat_id,
        }
    }
}

/// Outbound frame: a command tagged with its correlation id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientFrame {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(flatten)]
    pub command: ClientCommand,
}
