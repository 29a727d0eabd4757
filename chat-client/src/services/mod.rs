//! # Services
//!
//! External collaborators of the chat client. The push transport lives in
//! [`crate::transport`].

pub mod api;

pub use api::ApiClient;
