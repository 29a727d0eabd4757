//! User directory lookups.

use shared::dto::chat::{UserSearchResponse, UserSummary};

use super::client::ApiClient;
use crate::core::error::Result;

/// Search users by name or email
pub async fn search_users(api: &ApiClient, query: &str) -> Result<Vec<UserSummary>> {
    let response = api
        .authorized(api.client.get(api.url("/api/users/search")))
        .query(&[("q", query)])
        .send()
        .await?;

    let body: UserSearchResponse = ApiClient::read_json(response).await?;
    Ok(body.users)
}
