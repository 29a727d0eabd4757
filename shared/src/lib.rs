//! # Shared Chat DTO Library
//!
//! This library defines the contract between the chat client and the chat
//! backend. All DTOs use JSON serialization via `serde`.
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects
//!   - **[`dto::chat`]**: Conversations, messages, user search
//!   - **[`dto::events`]**: Push events and client commands
//! - **[`utils`]**: Display helpers
//!   - **[`utils::preview`]**: Single-line message preview with ellipsis
//!   - **[`utils::initials`]**: Avatar fallback initials
//!
//! ## Usage
//!
//! ```rust
//! use shared::dto::events::ServerEvent;
//!
//! let text = r#"{"event":"user:online","data":{"user_id":"u1"}}"#;
//! let event: ServerEvent = serde_json::from_str(text).unwrap();
//! assert_eq!(event.name(), "user:online");
//! ```

pub mod dto;
pub mod utils;

// Wildcard re-exports: shared is a DTO library where all exports are public API
pub use dto::*;
pub use utils::*;
