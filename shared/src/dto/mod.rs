//! # Data Transfer Objects (DTOs)
//!
//! Structures exchanged with the chat backend, over REST and over the push
//! transport.
//!
//! ## Module Organization
//!
//! - [`chat`] - Conversations, participants, messages and REST bodies
//! - [`events`] - WebSocket frames: push events, commands and acknowledgements
//!
//! ## Serialization Format
//!
//! - **Field naming**: snake_case (default serde behavior)
//! - **Optional fields**: Omitted when `None`, defaulted when missing
//! - **Timestamps**: RFC 3339 via `chrono`
//! - **Frames**: adjacently tagged (`event` + `data`)

pub mod chat;
pub mod events;

pub use chat::*;
pub use events::*;
