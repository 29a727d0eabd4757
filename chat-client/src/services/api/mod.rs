//! # Backend API Client Module
//!
//! HTTP client for the chat backend's REST surface.
//!
//! ## Module Structure
//!
//! ```text
//! api/
//! ├── mod.rs      - Module exports and documentation
//! ├── client.rs   - ApiClient struct, error mapping, ChatApi impl
//! ├── chats.rs    - Conversation endpoints (list, history, create, delete, read)
//! └── users.rs    - User search
//! ```

pub mod chats;
pub mod client;
pub mod users;

pub use client::ApiClient;
