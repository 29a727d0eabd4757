//! # Core Abstractions
//!
//! - **[`error`]**: Chat-client error type (`ChatError`, `Result<T>`)
//! - **[`service`]**: Service traits for dependency injection (`ChatApi`, `ChatTransport`)
//!
//! ```rust,ignore
//! use chat_client::core::service::{ChatApi, ChatTransport};
//!
//! // In production: real implementations
//! let api: Arc<dyn ChatApi> = Arc::new(ApiClient::new(&config, session.clone())?);
//! let transport: Arc<dyn ChatTransport> = Arc::new(ChatSocket::new(&config));
//!
//! // In tests: in-memory implementations
//! let api: Arc<dyn ChatApi> = Arc::new(MockApi::default());
//! ```

pub mod error;
pub mod service;

pub use error::{ChatError, Result};
pub use service::{ChatApi, ChatTransport};
