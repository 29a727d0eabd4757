//! User search with stale-response suppression.

use shared::dto::chat::UserSummary;

#[derive(Debug, Clone)]
pub struct UserSearch {
    min_chars: usize,
    generation: u64,
    query: String,
    results: Vec<UserSummary>,
}

impl UserSearch {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars, generation: 0, query: String::new(), results: Vec::new() }
    }

    /// Start a search for `query`.
    ///
    /// Returns the generation and trimmed query to send, or `None` when the
    /// query is too short; in that case the results are cleared and any
    /// in-flight response is invalidated.
    pub fn begin(&mut self, query: &str) -> Option<(u64, String)> {
        self.generation += 1;
        self.query = query.trim().to_string();

        if self.query.chars().count() < self.min_chars {
            self.results.clear();
            return None;
        }
        Some((self.generation, self.query.clone()))
    }

    /// Install results if they answer the latest query
    pub fn complete(&mut self, generation: u64, results: Vec<UserSummary>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.results = results;
        true
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.query.clear();
        self.results.clear();
    }

    pub fn results(&self) -> &[UserSummary] {
        &self.results
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}
