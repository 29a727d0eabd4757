//! # WebSocket Chat Transport
//!
//! One persistent WebSocket connection per session. A supervisor task owns
//! the connection:
//!
//! - connection establishment with the bearer token
//! - automatic reconnection with exponential backoff (see [`Backoff`])
//! - re-joining every room after a reconnect, then emitting
//!   [`TransportEvent::Reconnected`]
//! - parsing push frames and re-emitting them on the [`EventBus`]
//! - routing `ack` frames to the command awaiting them
//!
//! Outbound frames go through an unbounded channel drained by the same task,
//! so commands never block on the socket.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use shared::dto::chat::ConversationId;
use shared::dto::events::{ClientCommand, ClientFrame, CommandAck, ServerEvent};
use shared::utils::preview;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::connection::{Backoff, ConnectionState, ConnectionStatus};
use super::events::{EventBus, EventKind, Handler, HandlerId, TransportEvent};
use super::pending::PendingAcks;
use crate::config::{ClientConfig, ReconnectPolicy};
use crate::core::error::{ChatError, Result};
use crate::core::service::ChatTransport;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push transport over a single WebSocket
pub struct ChatSocket {
    inner: Arc<SocketInner>,
}

struct SocketInner {
    url: String,
    ack_timeout: Duration,
    reconnect: ReconnectPolicy,
    bus: EventBus,
    pending: PendingAcks,
    /// Rooms to restore after a reconnect
    rooms: Mutex<BTreeSet<ConversationId>>,
    /// Writer of the live connection, `None` while disconnected
    outbound: Mutex<Option<mpsc::UnboundedSender<WsMessage>>>,
    status: watch::Sender<ConnectionStatus>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    stopping: AtomicBool,
}

impl ChatSocket {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_options(config.ws_url.clone(), config.ack_timeout, config.reconnect.clone())
    }

    pub fn with_options(url: impl Into<String>, ack_timeout: Duration, reconnect: ReconnectPolicy) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            inner: Arc::new(SocketInner {
                url: url.into(),
                ack_timeout,
                reconnect,
                bus: EventBus::new(),
                pending: PendingAcks::new(),
                rooms: Mutex::new(BTreeSet::new()),
                outbound: Mutex::new(None),
                status,
                supervisor: Mutex::new(None),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    pub fn joined_rooms(&self) -> Vec<ConversationId> {
        self.inner.rooms.lock().iter().cloned().collect()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Commands still waiting for an acknowledgement
    pub fn pending_acks(&self) -> usize {
        self.inner.pending.len()
    }
}

impl Drop for ChatSocket {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.supervisor.lock().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl ChatTransport for ChatSocket {
    fn connect(&self, token: &str) -> Result<()> {
        let mut supervisor = self.inner.supervisor.lock();
        if supervisor.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!(url = %self.inner.url, "Chat transport already running, ignoring connect");
            return Ok(());
        }

        // Fail fast on a malformed URL or token instead of inside the retry loop
        build_request(&self.inner.url, token)?;

        self.inner.stopping.store(false, Ordering::SeqCst);
        let inner = self.inner.clone();
        let token = token.to_string();
        *supervisor = Some(tokio::spawn(async move { inner.run(token).await }));
        Ok(())
    }

    fn disconnect(&self) {
        {
            let mut outbound = self.inner.outbound.lock();
            self.inner.stopping.store(true, Ordering::SeqCst);
            outbound.take();
        }
        if let Some(handle) = self.inner.supervisor.lock().take() {
            handle.abort();
        }
        self.inner.rooms.lock().clear();
        let failed = self.inner.pending.fail_all();
        info!(pending_failed = failed, "Chat transport disconnected");
        self.inner.set_state(ConnectionState::Disconnected);
    }

    fn on(&self, kind: EventKind, handler: Handler) -> HandlerId {
        self.inner.bus.on(kind, handler)
    }

    fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.inner.bus.off(kind, id)
    }

    fn connection_state(&self) -> ConnectionState {
        self.inner.status.borrow().state
    }

    async fn request(&self, command: ClientCommand) -> Result<CommandAck> {
        let name = command.name();
        let reference = Uuid::new_v4().to_string();
        let waiter = self.inner.pending.register(&reference);
        // Entry goes away on every exit path, including a dropped future
        let _guard = self.inner.pending.guard(&reference);

        self.inner.send_frame(&reference, command)?;

        match timeout(self.inner.ack_timeout, waiter).await {
            Ok(Ok(Ok(ack))) if ack.ok => Ok(ack),
            Ok(Ok(Ok(ack))) => {
                warn!(command = name, reference = %reference, error = ?ack.error, "Command rejected by server");
                Err(ChatError::Rejected(ack.error.unwrap_or_else(|| format!("{name} rejected"))))
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(ChatError::Disconnected),
            Err(_) => {
                warn!(
                    command = name,
                    reference = %reference,
                    timeout_ms = self.inner.ack_timeout.as_millis() as u64,
                    "No acknowledgement before timeout"
                );
                Err(ChatError::Timeout(name.to_string()))
            }
        }
    }

    fn emit(&self, command: ClientCommand) {
        let name = command.name();
        let reference = Uuid::new_v4().to_string();
        if let Err(e) = self.inner.send_frame(&reference, command) {
            debug!(command = name, error = %e, "Dropping fire-and-forget command");
        }
    }

    async fn join_chat(&self, chat_id: &str) -> Result<CommandAck> {
        // Remembered even if this join fails, so a reconnect restores it
        self.inner.rooms.lock().insert(chat_id.to_string());
        self.request(ClientCommand::JoinChat { chat_id: chat_id.to_string() }).await
    }

    fn leave_chat(&self, chat_id: &str) {
        self.inner.rooms.lock().remove(chat_id);
        self.emit(ClientCommand::LeaveChat { chat_id: chat_id.to_string() });
    }
}

impl SocketInner {
    /// Supervisor loop: connect, pump frames, back off, repeat.
    async fn run(self: Arc<Self>, token: String) {
        let mut backoff = Backoff::new(&self.reconnect);
        let mut connected_before = false;

        loop {
            if self.stopping.load(Ordering::SeqCst) {
                return;
            }

            let state = if connected_before || backoff.attempts() > 0 {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Connecting
            };
            self.set_state(state);
            self.status.send_modify(|status| status.connection_attempts += 1);

            let request = match build_request(&self.url, &token) {
                Ok(request) => request,
                Err(e) => {
                    error!(url = %self.url, error = %e, "Cannot build chat transport request");
                    self.record_error(e.to_string());
                    self.set_state(ConnectionState::Failed);
                    return;
                }
            };

            match connect_async(request).await {
                Ok((stream, response)) => {
                    info!(
                        url = %self.url,
                        status = ?response.status(),
                        reconnect = connected_before,
                        "Chat transport connection established"
                    );
                    backoff.reset();

                    let (tx, rx) = mpsc::unbounded_channel();
                    if !self.install_writer(tx) {
                        debug!("Disconnect requested during handshake, dropping connection");
                        return;
                    }
                    self.set_state(ConnectionState::Connected);

                    if connected_before {
                        self.rejoin_rooms();
                        self.bus.emit(&TransportEvent::Reconnected);
                    }
                    connected_before = true;

                    self.pump(stream, rx).await;

                    self.outbound.lock().take();
                    let failed = self.pending.fail_all();
                    if self.stopping.load(Ordering::SeqCst) {
                        return;
                    }
                    warn!(pending_failed = failed, "Chat transport connection lost, reconnecting...");
                    self.set_state(ConnectionState::Reconnecting);
                }
                Err(e) => {
                    let unauthorized = matches!(
                        &e,
                        tungstenite::Error::Http(response) if response.status() == StatusCode::UNAUTHORIZED
                    );
                    error!(
                        url = %self.url,
                        error = %e,
                        attempt = backoff.attempts() + 1,
                        "Failed to connect chat transport"
                    );
                    self.record_error(e.to_string());

                    if unauthorized {
                        // Same token will be rejected again
                        self.set_state(ConnectionState::Failed);
                        return;
                    }
                }
            }

            match backoff.next_delay() {
                Some(delay) => {
                    info!(
                        attempt = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "Reconnecting chat transport after backoff"
                    );
                    sleep(delay).await;
                }
                None => {
                    error!(
                        attempts = backoff.attempts(),
                        "Chat transport reconnect attempts exhausted, giving up"
                    );
                    self.set_state(ConnectionState::Failed);
                    return;
                }
            }
        }
    }

    /// Read push frames and write queued commands until the connection ends.
    async fn pump(&self, stream: Socket, mut outbound: mpsc::UnboundedReceiver<WsMessage>) {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => self.handle_text(&text),
                    Some(Ok(WsMessage::Ping(data))) => {
                        trace!(data_len = data.len(), "Received ping, sending pong");
                        if let Err(e) = write.send(WsMessage::Pong(data)).await {
                            error!(error = %e, "Failed to send pong response");
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => trace!("Received pong"),
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!(
                            code = ?frame.as_ref().map(|f| f.code),
                            reason = ?frame.as_ref().map(|f| f.reason.to_string()),
                            "Chat transport closed by server"
                        );
                        break;
                    }
                    Some(Ok(_)) => trace!("Ignoring non-text frame"),
                    Some(Err(e)) => {
                        error!(error = %e, "Chat transport read error");
                        break;
                    }
                    None => break,
                },
                outgoing = outbound.recv() => match outgoing {
                    Some(message) => {
                        if let Err(e) = write.send(message).await {
                            error!(error = %e, "Chat transport write error");
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                },
            }
        }
    }

    fn handle_text(&self, text: &str) {
        self.status.send_modify(|status| {
            status.messages_received += 1;
            status.last_message = Some(Instant::now());
        });

        match serde_json::from_str::<ServerEvent>(text) {
            Ok(ServerEvent::Ack(ack)) => {
                let event = TransportEvent::Server(ServerEvent::Ack(ack.clone()));
                let reference = ack.reference.clone();
                if !self.pending.resolve(ack) {
                    debug!(reference = %reference, "Ack for unknown or expired command");
                }
                self.bus.emit(&event);
            }
            Ok(event) => {
                debug!(event = event.name(), "Push event received");
                self.bus.emit(&TransportEvent::Server(event));
            }
            Err(e) => {
                warn!(
                    error = %e,
                    message_length = text.len(),
                    message_preview = %preview(text, 100),
                    "Failed to parse push frame, dropping it"
                );
            }
        }
    }

    fn send_frame(&self, reference: &str, command: ClientCommand) -> Result<()> {
        let name = command.name();
        let frame = ClientFrame { reference: reference.to_string(), command };
        let text = serde_json::to_string(&frame)?;

        let outbound = self.outbound.lock();
        let tx = outbound.as_ref().ok_or(ChatError::Disconnected)?;
        tx.send(WsMessage::Text(text)).map_err(|_| ChatError::Disconnected)?;
        trace!(command = name, reference = %reference, "Frame queued");
        Ok(())
    }

    /// Publish the writer of a fresh connection unless a disconnect won the race
    fn install_writer(&self, tx: mpsc::UnboundedSender<WsMessage>) -> bool {
        let mut outbound = self.outbound.lock();
        if self.stopping.load(Ordering::SeqCst) {
            return false;
        }
        *outbound = Some(tx);
        true
    }

    fn rejoin_rooms(&self) {
        let rooms: Vec<ConversationId> = self.rooms.lock().iter().cloned().collect();
        info!(rooms = rooms.len(), "Re-joining chat rooms after reconnect");
        for chat_id in rooms {
            let reference = Uuid::new_v4().to_string();
            if let Err(e) = self.send_frame(&reference, ClientCommand::JoinChat { chat_id: chat_id.clone() }) {
                warn!(chat_id = %chat_id, error = %e, "Failed to re-join room");
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let changed = self.status.send_if_modified(|status| {
            // After disconnect() only Disconnected may be published
            if state != ConnectionState::Disconnected && self.stopping.load(Ordering::SeqCst) {
                return false;
            }
            let changed = status.state != state;
            status.state = state;
            if state == ConnectionState::Connected {
                status.connection_attempts = 0;
                status.last_connected = Some(Instant::now());
                status.last_error = None;
                return true;
            }
            changed
        });

        if changed {
            debug!(state = %state, "Chat transport state changed");
            self.bus.emit(&TransportEvent::Connection(state));
        }
    }

    fn record_error(&self, message: String) {
        self.status.send_modify(|status| status.last_error = Some(message));
    }
}

/// Handshake request carrying the bearer token
fn build_request(url: &str, token: &str) -> Result<Request> {
    let mut request = url.into_client_request()?;
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| ChatError::Config(format!("Token is not a valid header value: {e}")))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}
