//! # Connection State Machine
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
//!                                 │                  │ drop
//!                                 │ err              ▼
//!                                 └──────────▶ Reconnecting ──backoff──▶ (retry)
//!                                                    │ attempts exhausted
//!                                                    ▼
//!                                                  Failed
//! ```
//!
//! Retry delays grow exponentially with jitter, see [`Backoff`].

use rand::Rng;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::ReconnectPolicy;

/// Push transport connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected, not attempting
    #[default]
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    Connected,
    /// Connection lost or attempt failed, retrying after backoff
    Reconnecting,
    /// Gave up after the configured number of attempts
    Failed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Connection status details, published through a `watch` channel
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Attempts since the last successful connection
    pub connection_attempts: u32,
    pub last_error: Option<String>,
    pub last_connected: Option<Instant>,
    /// Push frames received over the session
    pub messages_received: u64,
    pub last_message: Option<Instant>,
}

/// Exponential backoff with jitter.
///
/// Each call to [`Backoff::next_delay`] consumes one attempt and doubles the
/// base delay up to `max`. `max_attempts == 0` retries forever.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
    attempts: u32,
    max_attempts: u32,
    /// Fraction of the delay added or removed at random (0.2 = ±20 %)
    jitter: f64,
}

impl Backoff {
    pub const DEFAULT_JITTER: f64 = 0.2;

    pub fn new(policy: &ReconnectPolicy) -> Self {
        Self {
            initial: policy.initial_delay,
            max: policy.max_delay.max(policy.initial_delay),
            current: policy.initial_delay,
            attempts: 0,
            max_attempts: policy.max_attempts,
            jitter: Self::DEFAULT_JITTER,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.max_attempts != 0 && self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;

        let base = self.current;
        self.current = (self.current * 2).min(self.max);

        if self.jitter <= 0.0 {
            return Some(base);
        }
        let factor = rand::rng().random_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        Some(base.mul_f64(factor))
    }

    /// Back to the initial delay after a successful connection
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial_ms: u64, max_ms: u64, max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(max_ms),
            max_attempts,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(&policy(1000, 5000, 0)).with_jitter(0.0);
        let delays: Vec<u64> = (0..5)
            .map(|_| backoff.next_delay().unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 5000, 5000]);
    }

    #[test]
    fn test_backoff_gives_up_after_max_attempts() {
        let mut backoff = Backoff::new(&policy(10, 100, 3)).with_jitter(0.0);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::new(&policy(100, 1000, 2)).with_jitter(0.0);
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), None);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_backoff_jitter_stays_in_band() {
        let mut backoff = Backoff::new(&policy(1000, 1000, 0));
        for _ in 0..50 {
            let delay = backoff.next_delay().unwrap();
            assert!(delay >= Duration::from_millis(790), "{delay:?}");
            assert!(delay <= Duration::from_millis(1210), "{delay:?}");
        }
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Failed.is_connected());
    }
}
