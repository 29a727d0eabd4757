//! # Conversation Endpoints
//!
//! Conversation list, history, direct-chat creation, archive and read state.

use shared::dto::chat::{ChatListResponse, ChatResponse, Conversation, Message, MessagesResponse, StartChatRequest};
use tracing::debug;

use super::client::ApiClient;
use crate::core::error::Result;

/// Fetch every conversation of the current user
pub async fn list_chats(api: &ApiClient) -> Result<Vec<Conversation>> {
    let response = api
        .authorized(api.client.get(api.url("/api/chats")))
        .send()
        .await?;

    let body: ChatListResponse = ApiClient::read_json(response).await?;
    debug!(count = body.chats.len(), "Fetched conversation list");
    Ok(body.chats)
}

/// Message history of one conversation
pub async fn get_messages(api: &ApiClient, chat_id: &str) -> Result<Vec<Message>> {
    let response = api
        .authorized(api.client.get(api.url(&format!("/api/chats/{chat_id}/messages"))))
        .send()
        .await?;

    let body: MessagesResponse = ApiClient::read_json(response).await?;
    debug!(chat_id, count = body.messages.len(), "Fetched message history");
    Ok(body.messages)
}

/// Get or create the direct conversation with `user_id`
pub async fn get_or_create_direct(api: &ApiClient, user_id: &str) -> Result<Conversation> {
    let request = StartChatRequest { user_id: user_id.to_string() };

    let response = api
        .authorized(api.client.post(api.url("/api/chats")))
        .json(&request)
        .send()
        .await?;

    let body: ChatResponse = ApiClient::read_json(response).await?;
    Ok(body.chat)
}

pub async fn delete_chat(api: &ApiClient, chat_id: &str) -> Result<()> {
    let response = api
        .authorized(api.client.delete(api.url(&format!("/api/chats/{chat_id}"))))
        .send()
        .await?;

    ApiClient::read_empty(response).await
}

pub async fn mark_read(api: &ApiClient, chat_id: &str) -> Result<()> {
    let response = api
        .authorized(api.client.put(api.url(&format!("/api/chats/{chat_id}/read"))))
        .send()
        .await?;

    ApiClient::read_empty(response).await
}
