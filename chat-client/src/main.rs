//! `chat-client` binary: connect with the stored session and log chat
//! activity until Ctrl-C.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use chat_client::logging::{self, LogConfig};
use chat_client::{
    ApiClient, ChatController, ChatError, ChatSocket, ChatUpdate, ClientConfig, FileTokenStore, Result, Session,
    TokenStore,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Chat client exited with error");
        eprintln!("chat-client: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = ClientConfig::from_env()?;
    let _log_guard = logging::init(&LogConfig::from_env(&config))?;

    info!(api_url = %config.api_url, ws_url = %config.ws_url, "Starting chat client");

    let session = Arc::new(load_session(&FileTokenStore::new(&config.token_file))?);
    let api = Arc::new(ApiClient::new(&config, session.clone())?);
    let transport = Arc::new(ChatSocket::new(&config));

    let chat = ChatController::new(config, session, api, transport);
    let mut updates = chat.subscribe();
    chat.start().await?;

    if let Ok(chat_id) = std::env::var("CHAT_OPEN") {
        if let Err(e) = chat.select_chat(&chat_id).await {
            warn!(chat_id = %chat_id, error = %e, "Could not open conversation");
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            update = updates.recv() => match update {
                Ok(update) => log_update(&chat, &update),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Update feed lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    chat.shutdown();
    Ok(())
}

/// `CHAT_TOKEN` + `CHAT_USER_ID` override and replace the stored session.
fn load_session(store: &dyn TokenStore) -> Result<Session> {
    if let (Ok(token), Ok(user_id)) = (std::env::var("CHAT_TOKEN"), std::env::var("CHAT_USER_ID")) {
        let session = Session::new(token, user_id);
        store.save(&session)?;
        return Ok(session);
    }

    store
        .load()?
        .ok_or_else(|| ChatError::Unauthorized("no stored session, set CHAT_TOKEN and CHAT_USER_ID".to_string()))
}

fn log_update(chat: &ChatController, update: &ChatUpdate) {
    match update {
        ChatUpdate::ConversationsChanged => {
            info!(
                conversations = chat.conversations().len(),
                unread = chat.unread_total(),
                "Conversations updated"
            );
        }
        ChatUpdate::MessagesChanged { chat_id, .. } => {
            let messages = chat.active_messages();
            let last = messages
                .last()
                .map(|m| format!("{}: {}", m.sender_id, shared::preview(&m.content, 60)))
                .unwrap_or_default();
            info!(chat_id = %chat_id, count = messages.len(), last = %last, "Messages updated");
        }
        ChatUpdate::TypingChanged { chat_id, users } => {
            info!(chat_id = %chat_id, typing = ?users, "Typing changed");
        }
        ChatUpdate::PresenceChanged { user_id, online } => {
            info!(user_id = %user_id, online, "Presence changed");
        }
        ChatUpdate::ConnectionChanged(state) => info!(state = %state, "Connection changed"),
        ChatUpdate::SearchResults(users) => info!(results = users.len(), "Search results"),
        ChatUpdate::Error(message) => warn!(message = %message, "Chat error"),
    }
}
