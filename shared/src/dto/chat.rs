//! # Chat Data Transfer Objects
//!
//! Conversations, participants and messages as the REST endpoints return them,
//! plus the request/response bodies of the chat and user-directory endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Backend user identifier
pub type UserId = String;
/// Backend conversation identifier
pub type ConversationId = String;
/// Backend message identifier
pub type MessageId = String;

/// Participant summary as shown on a conversation card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_online: bool,
}

/// A single chat message.
///
/// A message is considered delivered once the backend echoes it over the
/// push transport; there is no explicit pending state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Correlation id of the send command that produced this message, when
    /// the backend echoes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
}

/// Last-message preview carried by the conversation list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: UserId,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for LastMessage {
    fn from(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            sender_id: message.sender_id.clone(),
            timestamp: message.timestamp,
        }
    }
}

/// Conversation between two or more participants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    /// Unread counter per user id
    #[serde(default)]
    pub unread_count: HashMap<UserId, u32>,
    /// Loaded lazily when the conversation is opened
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Unread messages for `user_id` (0 when absent)
    pub fn unread_for(&self, user_id: &str) -> u32 {
        self.unread_count.get(user_id).copied().unwrap_or(0)
    }

    /// First participant that is not `me` (the peer of a direct chat)
    pub fn peer_of(&self, me: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id != me)
    }

    /// Timestamp used to order the conversation list, most recent first
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        match (&self.last_message, self.updated_at) {
            (Some(last), Some(updated)) => Some(last.timestamp.max(updated)),
            (Some(last), None) => Some(last.timestamp),
            (None, updated) => updated,
        }
    }
}

/// User-directory entry returned by search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// `GET /api/chats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatListResponse {
    pub chats: Vec<Conversation>,
}

/// `POST /api/chats` and `GET /api/chats/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub chat: Conversation,
}

/// `GET /api/chats/{id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

/// Get-or-create direct chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartChatRequest {
    pub user_id: UserId,
}

/// `GET /api/users/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSearchResponse {
    pub users: Vec<UserSummary>,
}

/// Error body of a non-2xx response. Backends use either `message` or `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_conversation_defaults_when_fields_missing() {
        let json = r#"{"id":"c1","participants":[{"id":"u1","name":"Ada"}]}"#;
        let conv: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conv.id, "c1");
        assert!(conv.messages.is_empty());
        assert_eq!(conv.unread_for("u1"), 0);
        assert!(!conv.participants[0].is_online);
    }

    #[test]
    fn test_last_activity_prefers_latest() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let conv = Conversation {
            id: "c1".into(),
            participants: vec![],
            last_message: Some(LastMessage {
                content: "hi".into(),
                sender_id: "u1".into(),
                timestamp: late,
            }),
            unread_count: HashMap::new(),
            messages: vec![],
            updated_at: Some(early),
        };
        assert_eq!(conv.last_activity(), Some(late));
    }

    #[test]
    fn test_peer_of_skips_self() {
        let conv = Conversation {
            id: "c1".into(),
            participants: vec![
                Participant { id: "me".into(), name: "Me".into(), avatar: None, is_online: true },
                Participant { id: "u2".into(), name: "Grace".into(), avatar: None, is_online: false },
            ],
            last_message: None,
            unread_count: HashMap::new(),
            messages: vec![],
            updated_at: None,
        };
        assert_eq!(conv.peer_of("me").map(|p| p.name.as_str()), Some("Grace"));
    }

    #[test]
    fn test_error_body_text() {
        let body: ApiErrorBody = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert_eq!(body.text(), Some("nope"));
        let body: ApiErrorBody = serde_json::from_str(r#"{"message":"bad","error":"x"}"#).unwrap();
        assert_eq!(body.text(), Some("bad"));
    }
}
