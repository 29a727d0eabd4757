//! # Client Configuration
//!
//! Configuration loaded from environment variables, validated on startup to
//! fail fast if misconfigured.
//!
//! | Variable | Default |
//! |---|---|
//! | `CHAT_API_URL` | `http://127.0.0.1:3001` |
//! | `CHAT_WS_URL` | API URL with `ws(s)://` scheme + `/ws` |
//! | `CHAT_TOKEN_FILE` | `.chat/session.json` |
//! | `CHAT_LOG_DIR` | `logs` |
//! | `CHAT_TYPING_IDLE_MS` | `2000` |
//! | `CHAT_ACK_TIMEOUT_MS` | `5000` |
//! | `CHAT_REQUEST_TIMEOUT_SECS` | `10` |
//! | `CHAT_REFRESH_SECS` | `30` |
//! | `CHAT_RECONNECT_INITIAL_MS` | `1000` |
//! | `CHAT_RECONNECT_MAX_MS` | `30000` |
//! | `CHAT_RECONNECT_MAX_ATTEMPTS` | `0` (unlimited) |
//! | `CHAT_SEARCH_MIN_CHARS` | `2` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::{ChatError, Result};

const DEFAULT_API_URL: &str = "http://127.0.0.1:3001";

/// Reconnect backoff settings for the push transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 0 retries forever
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL
    pub api_url: String,
    /// WebSocket endpoint of the push transport
    pub ws_url: String,
    /// Where the bearer token is persisted
    pub token_file: PathBuf,
    pub log_dir: PathBuf,
    /// Idle window after which a typing indicator expires
    pub typing_idle: Duration,
    /// How long a command waits for its acknowledgement
    pub ack_timeout: Duration,
    pub request_timeout: Duration,
    /// Periodic full refetch of the conversation list
    pub refresh_interval: Duration,
    pub reconnect: ReconnectPolicy,
    /// Shortest search query sent to the user directory
    pub search_min_chars: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: ws_url_for(DEFAULT_API_URL),
            token_file: PathBuf::from(".chat/session.json"),
            log_dir: PathBuf::from("logs"),
            typing_idle: Duration::from_millis(2000),
            ack_timeout: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
            search_min_chars: 2,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_url = env::var("CHAT_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        let ws_url = env::var("CHAT_WS_URL").unwrap_or_else(|_| ws_url_for(&api_url));

        let config = Self {
            ws_url,
            token_file: env::var("CHAT_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_file),
            log_dir: env::var("CHAT_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            typing_idle: Duration::from_millis(env_or("CHAT_TYPING_IDLE_MS", 2000)?),
            ack_timeout: Duration::from_millis(env_or("CHAT_ACK_TIMEOUT_MS", 5000)?),
            request_timeout: Duration::from_secs(env_or("CHAT_REQUEST_TIMEOUT_SECS", 10)?),
            refresh_interval: Duration::from_secs(env_or("CHAT_REFRESH_SECS", 30)?),
            reconnect: ReconnectPolicy {
                initial_delay: Duration::from_millis(env_or("CHAT_RECONNECT_INITIAL_MS", 1000)?),
                max_delay: Duration::from_millis(env_or("CHAT_RECONNECT_MAX_MS", 30_000)?),
                max_attempts: env_or("CHAT_RECONNECT_MAX_ATTEMPTS", 0)?,
            },
            search_min_chars: env_or("CHAT_SEARCH_MIN_CHARS", 2)?,
            api_url,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ChatError::Config(format!(
                "CHAT_API_URL must be an http(s) URL, got {}",
                self.api_url
            )));
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(ChatError::Config(format!(
                "CHAT_WS_URL must be a ws(s) URL, got {}",
                self.ws_url
            )));
        }
        if self.typing_idle.is_zero() || self.ack_timeout.is_zero() || self.refresh_interval.is_zero() {
            return Err(ChatError::Config(
                "typing idle, ack timeout and refresh interval must be non-zero".to_string(),
            ));
        }
        if self.reconnect.initial_delay.is_zero() || self.reconnect.max_delay < self.reconnect.initial_delay {
            return Err(ChatError::Config(
                "CHAT_RECONNECT_MAX_MS must be >= CHAT_RECONNECT_INITIAL_MS > 0".to_string(),
            ));
        }
        if self.search_min_chars == 0 {
            return Err(ChatError::Config("CHAT_SEARCH_MIN_CHARS must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Push endpoint for an API base URL: `http://host:3001` → `ws://host:3001/ws`
pub fn ws_url_for(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    base + "/ws"
}

/// Parse an environment variable, using `default` when it is unset.
fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ChatError::Config(format!("{name} has wrong format: {raw}"))),
        Err(_) => Ok(default),
    }
}
