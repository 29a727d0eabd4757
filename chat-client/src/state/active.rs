//! # Active Conversation
//!
//! The open conversation and its message sequence. Selection is
//! single-flight: each selection bumps a generation, and a history response
//! carrying an older generation is discarded, so the last selection wins no
//! matter in which order responses arrive.

use shared::dto::chat::{ConversationId, Message};
use std::collections::HashSet;

#[derive(Debug, Default, Clone)]
pub struct ActiveConversation {
    chat_id: Option<ConversationId>,
    messages: Vec<Message>,
    generation: u64,
    history_loaded: bool,
}

impl ActiveConversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `chat_id`, showing `cached` until history arrives.
    /// Returns the generation the history fetch must present.
    pub fn begin_select(&mut self, chat_id: &str, cached: Vec<Message>) -> u64 {
        self.generation += 1;
        self.chat_id = Some(chat_id.to_string());
        self.messages = cached;
        self.history_loaded = false;
        self.generation
    }

    /// Install fetched history if `generation` is still current.
    ///
    /// Messages pushed while the fetch was in flight are kept after the
    /// history, in arrival order.
    pub fn install_history(&mut self, generation: u64, history: Vec<Message>) -> bool {
        if generation != self.generation || self.chat_id.is_none() {
            return false;
        }

        let known: HashSet<String> = history.iter().map(|m| m.id.clone()).collect();
        let arrived: Vec<Message> = std::mem::take(&mut self.messages)
            .into_iter()
            .filter(|m| !known.contains(&m.id))
            .collect();

        self.messages = history;
        self.messages.extend(arrived);
        self.history_loaded = true;
        true
    }

    /// Append a pushed message if it belongs to the active conversation and
    /// is not a duplicate.
    pub fn append(&mut self, chat_id: &str, message: &Message) -> bool {
        if !self.is_active(chat_id) || self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message.clone());
        true
    }

    /// Close the view. Returns the conversation that was open.
    pub fn clear(&mut self) -> Option<ConversationId> {
        self.generation += 1;
        self.messages.clear();
        self.history_loaded = false;
        self.chat_id.take()
    }

    pub fn is_active(&self, chat_id: &str) -> bool {
        self.chat_id.as_deref() == Some(chat_id)
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn history_loaded(&self) -> bool {
        self.history_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(id: &str) -> Message {
        Message {
            id: id.into(),
            sender_id: "u2".into(),
            content: id.to_uppercase(),
            timestamp: Utc::now(),
            client_ref: None,
        }
    }

    fn ids(view: &ActiveConversation) -> Vec<&str> {
        view.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_stale_history_is_discarded() {
        let mut view = ActiveConversation::new();
        let first = view.begin_select("a", vec![]);
        let second = view.begin_select("b", vec![]);

        assert!(view.install_history(second, vec![message("b1")]));
        assert!(!view.install_history(first, vec![message("a1")]));
        assert_eq!(view.chat_id(), Some("b"));
        assert_eq!(ids(&view), vec!["b1"]);
    }

    #[test]
    fn test_pushed_messages_survive_history_install() {
        let mut view = ActiveConversation::new();
        let generation = view.begin_select("a", vec![message("m1")]);

        assert!(view.append("a", &message("m3")));
        assert!(view.install_history(generation, vec![message("m1"), message("m2")]));
        assert_eq!(ids(&view), vec!["m1", "m2", "m3"]);
        assert!(view.history_loaded());
    }

    #[test]
    fn test_append_only_for_active_conversation() {
        let mut view = ActiveConversation::new();
        view.begin_select("a", vec![]);

        assert!(!view.append("b", &message("x")));
        assert!(view.append("a", &message("y")));
        assert!(!view.append("a", &message("y")));
        assert_eq!(ids(&view), vec!["y"]);
    }

    #[test]
    fn test_clear_invalidates_in_flight_history() {
        let mut view = ActiveConversation::new();
        let generation = view.begin_select("a", vec![]);

        assert_eq!(view.clear(), Some("a".to_string()));
        assert!(!view.install_history(generation, vec![message("a1")]));
        assert!(view.messages().is_empty());
        assert_eq!(view.chat_id(), None);
    }
}
