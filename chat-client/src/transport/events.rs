//! # Transport Event Bus
//!
//! Named-event subscription for push events: any number of handlers per
//! [`EventKind`], registered with [`EventBus::on`] and removed with
//! [`EventBus::off`]. Handlers run on the socket's read task and must not
//! block; forward into a channel for anything heavier.

use parking_lot::RwLock;
use shared::dto::events::ServerEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::connection::ConnectionState;

/// Subscribable event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageNew,
    TypingStart,
    TypingStop,
    UserOnline,
    UserOffline,
    MessagesRead,
    Ack,
    /// Connection state changes and reconnects (client-local)
    Connection,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::MessageNew,
        EventKind::TypingStart,
        EventKind::TypingStop,
        EventKind::UserOnline,
        EventKind::UserOffline,
        EventKind::MessagesRead,
        EventKind::Ack,
        EventKind::Connection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageNew => "message:new",
            EventKind::TypingStart => "typing:start",
            EventKind::TypingStop => "typing:stop",
            EventKind::UserOnline => "user:online",
            EventKind::UserOffline => "user:offline",
            EventKind::MessagesRead => "messages:read",
            EventKind::Ack => "ack",
            EventKind::Connection => "connection",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the transport re-emits to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Server(ServerEvent),
    Connection(ConnectionState),
    /// Connection re-established after a drop; rooms were re-joined and
    /// subscribers should replay missed state.
    Reconnected,
}

impl TransportEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TransportEvent::Server(event) => match event {
                ServerEvent::MessageNew(_) => EventKind::MessageNew,
                ServerEvent::TypingStart(_) => EventKind::TypingStart,
                ServerEvent::TypingStop(_) => EventKind::TypingStop,
                ServerEvent::UserOnline(_) => EventKind::UserOnline,
                ServerEvent::UserOffline(_) => EventKind::UserOffline,
                ServerEvent::MessagesRead(_) => EventKind::MessagesRead,
                ServerEvent::Ack(_) => EventKind::Ack,
            },
            TransportEvent::Connection(_) | TransportEvent::Reconnected => EventKind::Connection,
        }
    }
}

/// Registered event handler
pub type Handler = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

/// Box a closure as a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&TransportEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Token returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<EventKind, Vec<(HandlerId, Handler)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: EventKind, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().entry(kind).or_default().push((id, handler));
        id
    }

    /// Returns false when `id` was not registered for `kind`
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        before != list.len()
    }

    /// Call every handler subscribed to the event's kind.
    ///
    /// The handler list is cloned out of the lock first, so handlers may
    /// call `on`/`off` themselves.
    pub fn emit(&self, event: &TransportEvent) -> usize {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, callback)| callback.clone()).collect())
            .unwrap_or_default();

        for callback in &handlers {
            callback(event);
        }
        handlers.len()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let counts: HashMap<&str, usize> = handlers
            .iter()
            .map(|(kind, list)| (kind.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
