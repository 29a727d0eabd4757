//! # API Client
//!
//! Main HTTP client for backend API communication.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::dto::chat::{ApiErrorBody, Conversation, Message, UserSummary};
use std::sync::Arc;
use tracing::warn;

use crate::config::ClientConfig;
use crate::core::error::{ChatError, Result};
use crate::core::service::ChatApi;
use crate::session::Session;

/// HTTP client for the chat backend.
///
/// Every request carries the session's bearer token. The underlying
/// connection pool is shared across clones of the inner `reqwest::Client`.
pub struct ApiClient {
    pub(crate) client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a client with the configured request timeout.
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self> {
        // Bounded timeout so a stalled backend never hangs the caller
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", self.session.bearer())
    }

    /// Decode a JSON body, or map the error status
    pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::read_error(response).await)
        }
    }

    /// Success without a body we care about
    pub(crate) async fn read_empty(response: Response) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_error(response).await)
        }
    }

    async fn read_error(response: Response) -> ChatError {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        let error = error_from_response(status, &body);
        warn!(status = status.as_u16(), url = %url, error = %error, "Chat API request failed");
        error
    }
}

/// Map a non-success response to a [`ChatError`].
///
/// The backend reports `{ "message": .. }` or `{ "error": .. }`; anything
/// else is passed through as raw text.
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> ChatError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.text().map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                trimmed.to_string()
            }
        });

    if status == StatusCode::UNAUTHORIZED {
        ChatError::Unauthorized(message)
    } else {
        ChatError::Http { status: status.as_u16(), message }
    }
}

#[async_trait::async_trait]
impl ChatApi for ApiClient {
    async fn list_chats(&self) -> Result<Vec<Conversation>> {
        crate::services::api::chats::list_chats(self).await
    }

    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        crate::services::api::chats::get_messages(self, chat_id).await
    }

    async fn get_or_create_direct(&self, user_id: &str) -> Result<Conversation> {
        crate::services::api::chats::get_or_create_direct(self, user_id).await
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        crate::services::api::chats::delete_chat(self, chat_id).await
    }

    async fn mark_read(&self, chat_id: &str) -> Result<()> {
        crate::services::api::chats::mark_read(self, chat_id).await
    }

    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>> {
        crate::services::api::users::search_users(self, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_maps_to_auth_error() {
        let error = error_from_response(StatusCode::UNAUTHORIZED, r#"{"message":"Token expired"}"#);
        assert!(matches!(error, ChatError::Unauthorized(ref m) if m == "Token expired"));
    }

    #[test]
    fn test_error_body_variants() {
        let error = error_from_response(StatusCode::NOT_FOUND, r#"{"error":"Chat not found"}"#);
        assert_eq!(error.to_string(), "API error (404): Chat not found");

        let error = error_from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(error.to_string(), "API error (502): upstream down");

        let error = error_from_response(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(error.to_string(), "API error (503): Service Unavailable");
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = ClientConfig { api_url: "http://localhost:3001/".into(), ..ClientConfig::default() };
        let client = ApiClient::new(&config, Arc::new(Session::new("t", "me"))).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(client.url("/api/chats"), "http://localhost:3001/api/chats");
    }
}
