//! # Chat Controller
//!
//! Wires the push transport, the REST API and [`ChatState`] together.
//!
//! ```text
//! ChatTransport ──handlers──▶ channel ──▶ event loop ──▶ ChatState ──▶ broadcast<ChatUpdate>
//!                                             │  ▲
//!                        typing sweep, resync │  │ REST results (generation checked)
//!                                             ▼  │
//!                                           ChatApi
//! ```
//!
//! State is behind `Arc<RwLock<ChatState>>` and the lock is never held across
//! an `.await`. Results of superseded requests (conversation history, user
//! search) are dropped by generation checks instead of cancellation.

use parking_lot::{Mutex, RwLock};
use shared::dto::chat::{Conversation, ConversationId, Message, UserId, UserSummary};
use shared::dto::events::{NewMessage, ServerEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::core::error::{ChatError, Result};
use crate::core::service::{ChatApi, ChatTransport};
use crate::session::Session;
use crate::state::{ChatState, MessagePatch};
use crate::transport::{handler, ConnectionState, EventKind, HandlerId, TransportEvent};
use crate::updates::ChatUpdate;


/// Typing expiry and coalesced refetch granularity
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(250);

const UPDATE_CAPACITY: usize = 256;

/// Events the controller subscribes to; acks are consumed by the transport
const SUBSCRIBED: [EventKind; 7] = [
    EventKind::MessageNew,
    EventKind::TypingStart,
    EventKind::TypingStop,
    EventKind::UserOnline,
    EventKind::UserOffline,
    EventKind::MessagesRead,
    EventKind::Connection,
];

#[derive(Default)]
struct Runtime {
    handlers: Vec<(EventKind, HandlerId)>,
    task: Option<JoinHandle<()>>,
}

/// Chat engine entry point. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ChatController {
    state: Arc<RwLock<ChatState>>,
    api: Arc<dyn ChatApi>,
    transport: Arc<dyn ChatTransport>,
    session: Arc<Session>,
    config: Arc<ClientConfig>,
    updates: broadcast::Sender<ChatUpdate>,
    /// Set by push events that the backend should confirm with a refetch
    resync: Arc<AtomicBool>,
    runtime: Arc<Mutex<Runtime>>,
}

impl ChatController {
    pub fn new(
        config: ClientConfig,
        session: Arc<Session>,
        api: Arc<dyn ChatApi>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(ChatState::new(session.user_id.clone(), &config))),
            api,
            transport,
            session,
            config: Arc::new(config),
            updates,
            resync: Arc::new(AtomicBool::new(false)),
            runtime: Arc::new(Mutex::new(Runtime::default())),
        }
    }

    /// Subscribe to the transport, connect, spawn the event loop and load
    /// the conversation list. Calling it again while running is a no-op.
    pub async fn start(&self) -> Result<()> {
        {
            let mut runtime = self.runtime.lock();
            if runtime.task.is_some() {
                debug!("Chat controller already started");
                return Ok(());
            }

            let (tx, rx) = async_channel::unbounded::<TransportEvent>();
            for kind in SUBSCRIBED {
                let tx = tx.clone();
                let id = self.transport.on(
                    kind,
                    handler(move |event| {
                        let _ = tx.try_send(event.clone());
                    }),
                );
                runtime.handlers.push((kind, id));
            }

            if let Err(e) = self.transport.connect(&self.session.token) {
                for (kind, id) in runtime.handlers.drain(..) {
                    self.transport.off(kind, id);
                }
                error!(error = %e, "Failed to start chat transport");
                return Err(e);
            }

            let controller = self.clone();
            runtime.task = Some(tokio::spawn(async move { controller.run(rx).await }));
        }

        info!(user_id = %self.session.user_id, "Chat controller started");

        if let Err(e) = self.load_chats().await {
            warn!(error = %e, "Initial conversation load failed, periodic refresh will retry");
        }
        Ok(())
    }

    /// Unsubscribe, stop background work, leave the open room and disconnect.
    pub fn shutdown(&self) {
        let (handlers, task) = {
            let mut runtime = self.runtime.lock();
            (std::mem::take(&mut runtime.handlers), runtime.task.take())
        };
        for (kind, id) in handlers {
            self.transport.off(kind, id);
        }
        if let Some(task) = task {
            task.abort();
        }

        let (stop, active) = {
            let mut state = self.state.write();
            (state.typing_out.stop(), state.active.chat_id().map(str::to_string))
        };
        if let Some(command) = stop {
            self.transport.emit(command);
        }
        if let Some(chat_id) = active {
            self.transport.leave_chat(&chat_id);
        }
        self.transport.disconnect();
        info!("Chat controller stopped");
    }

    async fn run(self, events: async_channel::Receiver<TransportEvent>) {
        let mut sweep = interval_at(Instant::now() + SWEEP_INTERVAL, SWEEP_INTERVAL);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let period = self.config.refresh_interval;
        let mut refresh = interval_at(Instant::now() + period, period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Drain queued push events before periodic work
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Ok(event) => self.handle_transport_event(event).await,
                    Err(_) => break,
                },
                _ = sweep.tick() => {
                    self.sweep(Instant::now());
                    if self.resync.swap(false, Ordering::SeqCst) {
                        debug!("Coalesced conversation refetch");
                        self.refresh().await;
                    }
                }
                _ = refresh.tick() => self.refresh().await,
            }
        }
        debug!("Chat controller event loop finished");
    }

    async fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Server(event) => self.apply_server_event(event, Instant::now()),
            TransportEvent::Connection(connection) => {
                self.state.write().connection = connection;
                info!(state = %connection, "Chat connection state changed");
                self.publish(ChatUpdate::ConnectionChanged(connection));
            }
            TransportEvent::Reconnected => self.resync_after_reconnect().await,
        }
    }

    /// Apply one push event to the local state and publish what changed.
    pub fn apply_server_event(&self, event: ServerEvent, now: Instant) {
        let mut updates = Vec::new();

        match event {
            ServerEvent::MessageNew(NewMessage { chat_id, message }) => {
                let mut receipt = false;
                {
                    let mut state = self.state.write();
                    let me = state.me.clone();
                    let active = state.active.is_active(&chat_id);

                    match state.conversations.apply_message(&chat_id, &message, &me, active) {
                        MessagePatch::Applied => {
                            updates.push(ChatUpdate::ConversationsChanged);
                            if !active {
                                self.resync.store(true, Ordering::SeqCst);
                            }
                        }
                        MessagePatch::Duplicate => {
                            debug!(chat_id = %chat_id, message_id = %message.id, "Duplicate message ignored");
                        }
                        MessagePatch::Unknown => {
                            debug!(chat_id = %chat_id, "Message for unknown conversation, scheduling refetch");
                            self.resync.store(true, Ordering::SeqCst);
                        }
                    }

                    if state.active.append(&chat_id, &message) {
                        updates.push(ChatUpdate::MessagesChanged {
                            chat_id: chat_id.clone(),
                            scroll_to_bottom: true,
                        });
                        receipt = message.sender_id != me;
                    }

                    // A message ends its sender's typing burst
                    if state.typing.stop(&chat_id, &message.sender_id) {
                        let users = state.typing.users(&chat_id, now);
                        updates.push(ChatUpdate::TypingChanged { chat_id: chat_id.clone(), users });
                    }
                }
                if receipt {
                    self.transport.mark_read(&chat_id);
                }
            }
            ServerEvent::TypingStart(signal) => {
                let mut state = self.state.write();
                if signal.user_id != state.me && state.typing.start(&signal.chat_id, &signal.user_id, now) {
                    let users = state.typing.users(&signal.chat_id, now);
                    updates.push(ChatUpdate::TypingChanged { chat_id: signal.chat_id, users });
                }
            }
            ServerEvent::TypingStop(signal) => {
                let mut state = self.state.write();
                if state.typing.stop(&signal.chat_id, &signal.user_id) {
                    let users = state.typing.users(&signal.chat_id, now);
                    updates.push(ChatUpdate::TypingChanged { chat_id: signal.chat_id, users });
                }
            }
            ServerEvent::UserOnline(signal) => self.apply_presence(&signal.user_id, true, &mut updates),
            ServerEvent::UserOffline(signal) => self.apply_presence(&signal.user_id, false, &mut updates),
            ServerEvent::MessagesRead(receipt) => {
                if self.state.write().conversations.mark_read(&receipt.chat_id, &receipt.user_id) {
                    updates.push(ChatUpdate::ConversationsChanged);
                }
            }
            ServerEvent::Ack(ack) => {
                debug!(reference = %ack.reference, "Ack reached controller, ignoring");
            }
        }

        for update in updates {
            self.publish(update);
        }
    }

    fn apply_presence(&self, user_id: &str, online: bool, updates: &mut Vec<ChatUpdate>) {
        let mut state = self.state.write();
        if !state.presence.set(user_id, online) {
            return;
        }
        let touched = state.conversations.set_presence(user_id, online);
        debug!(user_id, online, conversations = touched.len(), "Presence changed");

        updates.push(ChatUpdate::PresenceChanged { user_id: user_id.to_string(), online });
        if !touched.is_empty() {
            updates.push(ChatUpdate::ConversationsChanged);
        }
    }

    /// Expire remote typing indicators and our own idle typing signal.
    pub fn sweep(&self, now: Instant) {
        let mut updates = Vec::new();
        let stop = {
            let mut state = self.state.write();
            for chat_id in state.typing.expire(now) {
                let users = state.typing.users(&chat_id, now);
                updates.push(ChatUpdate::TypingChanged { chat_id, users });
            }
            state.typing_out.poll(now)
        };

        if let Some(command) = stop {
            self.transport.emit(command);
        }
        for update in updates {
            self.publish(update);
        }
    }

    /// Fetch the full conversation list and replace local state with it.
    pub async fn load_chats(&self) -> Result<()> {
        match self.api.list_chats().await {
            Ok(chats) => {
                let count = chats.len();
                {
                    let mut state = self.state.write();
                    state.presence.seed_from(chats.iter());
                    state.conversations.replace_all(chats);
                    // The open conversation is being read, whatever the server counted
                    let me = state.me.clone();
                    if let Some(active) = state.active.chat_id().map(str::to_string) {
                        state.conversations.mark_read(&active, &me);
                    }
                }
                debug!(count, "Conversation list loaded");
                self.publish(ChatUpdate::ConversationsChanged);
                Ok(())
            }
            Err(e) => {
                self.report("load conversations", &e);
                Err(e)
            }
        }
    }

    async fn refresh(&self) {
        if let Err(e) = self.load_chats().await {
            warn!(error = %e, "Conversation refresh failed");
        }
    }

    /// Replay state missed while the connection was down.
    async fn resync_after_reconnect(&self) {
        info!("Chat transport reconnected, resynchronising");
        self.refresh().await;

        let active = {
            let state = self.state.read();
            state
                .active
                .chat_id()
                .map(|chat_id| (chat_id.to_string(), state.active.generation()))
        };
        if let Some((chat_id, generation)) = active {
            if let Err(e) = self.load_history(&chat_id, generation).await {
                warn!(chat_id = %chat_id, error = %e, "Failed to reload history after reconnect");
            }
        }
    }

    /// Open a conversation. The last call wins when selections overlap.
    pub async fn select_chat(&self, chat_id: &str) -> Result<()> {
        let (generation, previous, stop, unread_cleared) = {
            let mut state = self.state.write();
            let me = state.me.clone();
            let previous = state
                .active
                .chat_id()
                .filter(|current| *current != chat_id)
                .map(str::to_string);
            let stop = state.typing_out.stop();
            let cached = state
                .conversations
                .get(chat_id)
                .map(|c| c.messages.clone())
                .unwrap_or_default();
            let generation = state.active.begin_select(chat_id, cached);
            let unread_cleared = state.conversations.mark_read(chat_id, &me);
            (generation, previous, stop, unread_cleared)
        };
        info!(chat_id, generation, "Selecting conversation");

        if let Some(command) = stop {
            self.transport.emit(command);
        }
        if let Some(previous) = previous {
            self.transport.leave_chat(&previous);
        }
        self.publish(ChatUpdate::MessagesChanged { chat_id: chat_id.to_string(), scroll_to_bottom: true });
        if unread_cleared {
            self.publish(ChatUpdate::ConversationsChanged);
        }

        if let Err(e) = self.transport.join_chat(chat_id).await {
            // History still loads over REST; the room is re-joined on reconnect
            warn!(chat_id, error = %e, "Failed to join conversation room");
        }

        if !self.state.read().active.is_current(generation) {
            let still_open = self.state.read().active.is_active(chat_id);
            if !still_open {
                debug!(chat_id, "Selection superseded while joining, leaving room");
                self.transport.leave_chat(chat_id);
            }
            return Ok(());
        }

        if !self.load_history(chat_id, generation).await? {
            return Ok(());
        }

        self.transport.mark_read(chat_id);
        if let Err(e) = self.api.mark_read(chat_id).await {
            warn!(chat_id, error = %e, "Failed to mark conversation as read");
        }
        Ok(())
    }

    /// Fetch history and install it if `generation` is still current.
    /// Returns whether it was installed.
    async fn load_history(&self, chat_id: &str, generation: u64) -> Result<bool> {
        let messages = match self.api.get_messages(chat_id).await {
            Ok(messages) => messages,
            Err(e) => {
                if self.state.read().active.is_current(generation) {
                    self.report("load messages", &e);
                    return Err(e);
                }
                return Ok(false);
            }
        };

        let installed = {
            let mut state = self.state.write();
            if state.active.install_history(generation, messages) {
                let merged = state.active.messages().to_vec();
                state.conversations.set_messages(chat_id, merged);
                true
            } else {
                false
            }
        };

        if installed {
            self.publish(ChatUpdate::MessagesChanged { chat_id: chat_id.to_string(), scroll_to_bottom: true });
        } else {
            debug!(chat_id, generation, "Discarding stale conversation history");
        }
        Ok(installed)
    }

    /// Send `text` to the open conversation.
    ///
    /// The message shows up once the backend echoes it, either in the ack or
    /// as a `message:new` push, whichever comes first.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ChatError::Validation("message is empty".to_string()));
        }

        let (chat_id, stop) = {
            let mut state = self.state.write();
            let Some(chat_id) = state.active.chat_id().map(str::to_string) else {
                return Err(ChatError::State("no conversation is open".to_string()));
            };
            (chat_id, state.typing_out.stop())
        };

        if let Some(command) = stop {
            self.transport.emit(command);
        }

        match self.transport.send_message(&chat_id, content).await {
            Ok(ack) => {
                debug!(chat_id = %chat_id, reference = %ack.reference, "Message acknowledged");
                if let Some(message) = ack.message {
                    self.apply_server_event(ServerEvent::MessageNew(NewMessage { chat_id, message }), Instant::now());
                }
                Ok(())
            }
            Err(e) => {
                self.report("send message", &e);
                Err(e)
            }
        }
    }

    pub fn handle_keystroke(&self) {
        self.handle_keystroke_at(Instant::now());
    }

    /// Keystroke in the composer of the open conversation
    pub fn handle_keystroke_at(&self, now: Instant) {
        let commands = {
            let mut state = self.state.write();
            let Some(chat_id) = state.active.chat_id().map(str::to_string) else {
                return;
            };
            state.typing_out.keystroke(&chat_id, now)
        };
        for command in commands {
            self.transport.emit(command);
        }
    }

    /// Archive a conversation on the backend and drop it locally.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        if let Err(e) = self.api.delete_chat(chat_id).await {
            self.report("delete conversation", &e);
            return Err(e);
        }

        let (was_active, stop) = {
            let mut state = self.state.write();
            state.conversations.remove(chat_id);
            state.typing.clear_chat(chat_id);
            if state.active.is_active(chat_id) {
                state.active.clear();
                (true, state.typing_out.stop())
            } else {
                (false, None)
            }
        };
        info!(chat_id, was_active, "Conversation deleted");

        if was_active {
            if let Some(command) = stop {
                self.transport.emit(command);
            }
            self.transport.leave_chat(chat_id);
            self.publish(ChatUpdate::MessagesChanged { chat_id: chat_id.to_string(), scroll_to_bottom: false });
        }
        self.publish(ChatUpdate::ConversationsChanged);
        Ok(())
    }

    /// Search the user directory. Only the latest query's results are kept.
    pub async fn search_users(&self, query: &str) -> Result<()> {
        let begun = self.state.write().search.begin(query);
        let Some((generation, query)) = begun else {
            self.publish(ChatUpdate::SearchResults(Vec::new()));
            return Ok(());
        };

        let users = match self.api.search_users(&query).await {
            Ok(users) => users,
            Err(e) => {
                let current = self.state.write().search.complete(generation, Vec::new());
                if current {
                    self.publish(ChatUpdate::SearchResults(Vec::new()));
                    self.report("search users", &e);
                    return Err(e);
                }
                return Ok(());
            }
        };

        let installed = {
            let mut state = self.state.write();
            let me = state.me.clone();
            let users: Vec<UserSummary> = users.into_iter().filter(|user| user.id != me).collect();
            state.search.complete(generation, users.clone()).then_some(users)
        };

        match installed {
            Some(users) => self.publish(ChatUpdate::SearchResults(users)),
            None => debug!(query = %query, "Discarding stale search results"),
        }
        Ok(())
    }

    /// Open the direct conversation with `user_id`, creating it if needed.
    pub async fn start_chat_with(&self, user_id: &str) -> Result<ConversationId> {
        let conversation = match self.api.get_or_create_direct(user_id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                self.report("start conversation", &e);
                return Err(e);
            }
        };

        let chat_id = conversation.id.clone();
        {
            let mut state = self.state.write();
            state.presence.seed_from([&conversation]);
            state.conversations.upsert(conversation);
            state.search.clear();
        }
        self.publish(ChatUpdate::ConversationsChanged);

        self.select_chat(&chat_id).await?;
        Ok(chat_id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatUpdate> {
        self.updates.subscribe()
    }

    /// Conversations, most recent activity first
    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.read().conversations.ordered()
    }

    pub fn active_chat_id(&self) -> Option<ConversationId> {
        self.state.read().active.chat_id().map(str::to_string)
    }

    pub fn active_messages(&self) -> Vec<Message> {
        self.state.read().active.messages().to_vec()
    }

    /// Remote users typing in the open conversation
    pub fn typing_users(&self) -> Vec<UserId> {
        self.state.read().active_typing_users(Instant::now())
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.state.read().presence.is_online(user_id)
    }

    pub fn search_results(&self) -> Vec<UserSummary> {
        self.state.read().search.results().to_vec()
    }

    pub fn unread_total(&self) -> u32 {
        let state = self.state.read();
        state.conversations.total_unread(&state.me)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.read().connection
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    pub fn resync_pending(&self) -> bool {
        self.resync.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Consistent copy of the whole state
    pub fn snapshot(&self) -> ChatState {
        self.state.read().clone()
    }

    fn report(&self, action: &str, error: &ChatError) {
        error!(action, error = %error, "Chat operation failed");
        let message = format!("Failed to {action}: {error}");
        self.state.write().last_error = Some(message.clone());
        self.publish(ChatUpdate::Error(message));
    }

    fn publish(&self, update: ChatUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }
}
