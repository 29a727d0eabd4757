//! Logging configuration from environment variables

use std::path::PathBuf;

use crate::config::ClientConfig;

pub const DEFAULT_FILTER: &str = "chat_client=info,warn";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the daily rotated log file
    pub log_dir: PathBuf,
    /// Rotated file prefix, a date suffix is appended
    pub file_name: String,
    /// Filter directives (e.g. "chat_client=debug,info")
    pub log_level: String,
    /// Mirror log lines to stderr
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_name: "chat-client.log".to_string(),
            log_level: DEFAULT_FILTER.to_string(),
            stderr: true,
        }
    }
}

impl LogConfig {
    /// `RUST_LOG` and `CHAT_LOG_STDERR` on top of the client's log directory
    pub fn from_env(client: &ClientConfig) -> Self {
        Self {
            log_dir: client.log_dir.clone(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
            stderr: std::env::var("CHAT_LOG_STDERR")
                .map(|v| v != "0")
                .unwrap_or(true),
            ..Self::default()
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(&self.file_name)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.log_level.contains("debug") || self.log_level.contains("trace")
    }
}
