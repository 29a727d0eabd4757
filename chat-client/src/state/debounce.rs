//! # Typing Debounce (sending side)
//!
//! Turns keystrokes into at most one `typing:start` per burst and a
//! `typing:stop` once the user has been idle for the configured window.

use shared::dto::chat::ConversationId;
use shared::dto::events::ClientCommand;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    idle: Duration,
    /// Conversation we announced typing in, and when to stop
    typing: Option<(ConversationId, Instant)>,
}

impl TypingDebouncer {
    pub fn new(idle: Duration) -> Self {
        Self { idle, typing: None }
    }

    /// Register a keystroke in `chat_id`; returns the commands to emit.
    pub fn keystroke(&mut self, chat_id: &str, now: Instant) -> Vec<ClientCommand> {
        let deadline = now + self.idle;
        let mut commands = Vec::new();

        match self.typing.take() {
            Some((current, _)) if current == chat_id => {
                self.typing = Some((current, deadline));
                return commands;
            }
            Some((previous, _)) => {
                commands.push(ClientCommand::StopTyping { chat_id: previous });
            }
            None => {}
        }

        commands.push(ClientCommand::StartTyping { chat_id: chat_id.to_string() });
        self.typing = Some((chat_id.to_string(), deadline));
        commands
    }

    /// Stop command once the idle deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<ClientCommand> {
        match &self.typing {
            Some((_, deadline)) if *deadline <= now => self.stop(),
            _ => None,
        }
    }

    /// Stop immediately (message sent, conversation switched)
    pub fn stop(&mut self) -> Option<ClientCommand> {
        self.typing
            .take()
            .map(|(chat_id, _)| ClientCommand::StopTyping { chat_id })
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.typing.as_ref().map(|(_, deadline)| *deadline)
    }
}
