//! # Push Transport
//!
//! - **[`socket`]**: WebSocket connection with reconnect supervision ([`ChatSocket`])
//! - **[`events`]**: Named-event subscription ([`EventBus`], [`EventKind`])
//! - **[`connection`]**: Connection state machine and backoff
//! - **[`pending`]**: Commands awaiting acknowledgement

pub mod connection;
pub mod events;
pub mod pending;
pub mod socket;

pub use connection::{Backoff, ConnectionState, ConnectionStatus};
pub use events::{handler, EventBus, EventKind, Handler, HandlerId, TransportEvent};
pub use pending::PendingAcks;
pub use socket::ChatSocket;
