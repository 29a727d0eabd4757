//! Outstanding commands awaiting their `ack`, keyed by correlation id.

use parking_lot::Mutex;
use shared::dto::events::CommandAck;
use std::collections::HashMap;
use tokio::sync::oneshot;

use crate::core::error::{ChatError, Result};

#[derive(Debug, Default)]
pub struct PendingAcks {
    waiting: Mutex<HashMap<String, oneshot::Sender<Result<CommandAck>>>>,
}

impl PendingAcks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register before the frame is written so a fast ack cannot be missed
    pub fn register(&self, reference: &str) -> oneshot::Receiver<Result<CommandAck>> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().insert(reference.to_string(), tx);
        rx
    }

    /// Deliver an ack to its waiter. Returns false for unknown or late refs.
    pub fn resolve(&self, ack: CommandAck) -> bool {
        let Some(tx) = self.waiting.lock().remove(&ack.reference) else {
            return false;
        };
        tx.send(Ok(ack)).is_ok()
    }

    pub fn cancel(&self, reference: &str) {
        self.waiting.lock().remove(reference);
    }

    /// Cancels `reference` when dropped, so an abandoned waiter never lingers
    pub fn guard<'a>(&'a self, reference: &'a str) -> PendingGuard<'a> {
        PendingGuard { pending: self, reference }
    }

    /// Fail every waiter with [`ChatError::Disconnected`]
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = self.waiting.lock().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(ChatError::Disconnected));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.waiting.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct PendingGuard<'a> {
    pending: &'a PendingAcks,
    reference: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.cancel(self.reference);
    }
}
