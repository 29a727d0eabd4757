//! # Real-time Chat Client - Library Root
//!
//! Headless chat engine for the learning platform: conversation list, open
//! conversation, presence, typing indicators and user search, kept in sync
//! with the backend over REST and a WebSocket push transport. Any UI can
//! drive it through [`ChatController`] and render from its snapshots.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              chat-client (this crate)                  │
//! ├────────────────────────────────────────────────────────┤
//! │  controller  - event loop, operations, ChatUpdate feed │
//! │  state       - conversations, active view, typing, ... │
//! │  transport   - WebSocket push, acks, reconnect         │
//! │  services    - REST client (reqwest)                   │
//! └────────────────────────────────────────────────────────┘
//!          │ HTTP                         │ WebSocket
//!          ▼                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Chat backend                         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - **config**: Environment driven [`ClientConfig`]
//! - **controller**: [`ChatController`], the entry point
//! - **core**: Error type and the `ChatApi` / `ChatTransport` seams
//! - **logging**: `tracing` subscriber and panic hook
//! - **services**: REST API client
//! - **session**: Bearer token and its persistence
//! - **state**: Synchronous chat state, no I/O
//! - **transport**: WebSocket transport with correlation-id acks
//! - **updates**: [`ChatUpdate`] notifications
//!
//! ## Example
//!
//! ```rust,no_run
//! use chat_client::{ApiClient, ChatController, ChatSocket, ClientConfig, Session};
//! use std::sync::Arc;
//!
//! # async fn run() -> chat_client::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let session = Arc::new(Session::new("jwt", "user-1"));
//! let api = Arc::new(ApiClient::new(&config, session.clone())?);
//! let transport = Arc::new(ChatSocket::new(&config));
//!
//! let chat = ChatController::new(config, session, api, transport);
//! chat.start().await?;
//! chat.select_chat("chat-42").await?;
//! chat.send_message("hello").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod core;
pub mod logging;
pub mod services;
pub mod session;
pub mod state;
pub mod transport;
pub mod updates;

pub use config::{ClientConfig, ReconnectPolicy};
pub use controller::ChatController;
pub use crate::core::{ChatApi, ChatError, ChatTransport, Result};
pub use services::ApiClient;
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use transport::{ChatSocket, ConnectionState};
pub use updates::ChatUpdate;
