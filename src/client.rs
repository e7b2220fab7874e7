//! Streaming chat client: one logical connection to the chat backend with
//! keep-alive pings and a single delayed reconnect after a peer close.
//!
//! Inbound events travel over a channel to [`ChatEvents`], which the owning
//! screen polls on its own task. Every event is stamped with the close
//! generation current when it was produced; `close()` bumps the generation,
//! so nothing produced before `close()` returned is ever observed afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::models::{SuggestedOption, ToolType};
use crate::protocol::{decode_frame, ChatEvent, ChatRequestFrame, ControlFrame};
use crate::storage::{self, Storage};
use crate::transport::{Connector, Transport, TransportEvent, WsConnector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    /// Dropped by the peer; a reconnect may be pending.
    Closed,
}

/// Receives chat events. Every method defaults to a no-op.
pub trait ChatListener {
    fn on_chunk(&mut self, _text: String) {}
    fn on_done(&mut self, _session_id: String) {}
    fn on_session(&mut self, _session_id: String) {}
    fn on_error(&mut self, _message: String) {}
    fn on_options(&mut self, _options: Vec<SuggestedOption>) {}
}

impl ChatEvent {
    pub fn dispatch<L: ChatListener + ?Sized>(self, listener: &mut L) {
        match self {
            ChatEvent::Chunk(text) => listener.on_chunk(text),
            ChatEvent::Done { session_id } => listener.on_done(session_id),
            ChatEvent::Session { session_id } => listener.on_session(session_id),
            ChatEvent::Error(message) => listener.on_error(message),
            ChatEvent::Options(options) => listener.on_options(options),
        }
    }
}

struct Tagged {
    generation: u64,
    event: ChatEvent,
}

struct Shared {
    state: ConnectionState,
    /// Bumped by every `close()`.
    generation: u64,
    /// Bumped by every installed transport.
    connection: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    reader: Option<JoinHandle<()>>,
    keepalive: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl Shared {
    fn stop_keepalive(&mut self) {
        if let Some(handle) = self.keepalive.take() {
            handle.abort();
        }
    }
}

struct Inner {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    storage: Arc<dyn Storage>,
    shared: Mutex<Shared>,
    events: mpsc::UnboundedSender<Tagged>,
}

/// Owned handle to one streaming connection. Dropping it closes the connection.
pub struct StreamingChatClient {
    inner: Arc<Inner>,
}

/// Event stream paired with a [`StreamingChatClient`].
///
/// Ends (returns `None`) once the client has been dropped.
pub struct ChatEvents {
    inner: Weak<Inner>,
    rx: mpsc::UnboundedReceiver<Tagged>,
}

impl StreamingChatClient {
    pub fn new(
        config: ClientConfig,
        connector: impl Connector,
        storage: Arc<dyn Storage>,
    ) -> (Self, ChatEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            config,
            connector: Box::new(connector),
            storage,
            shared: Mutex::new(Shared {
                state: ConnectionState::Idle,
                generation: 0,
                connection: 0,
                outbound: None,
                reader: None,
                keepalive: None,
                reconnect: None,
            }),
            events: tx,
        });
        let events = ChatEvents { inner: Arc::downgrade(&inner), rx };
        (Self { inner }, events)
    }

    /// Client over the production WebSocket transport.
    pub fn websocket(config: ClientConfig, storage: Arc<dyn Storage>) -> (Self, ChatEvents) {
        Self::new(config, WsConnector::new(), storage)
    }

    /// Opens the connection for the stored user id.
    ///
    /// A no-op while already open or connecting.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.inner.connect().await
    }

    /// Writes one chat request frame. Only valid while [`ConnectionState::Open`].
    pub fn send_message(
        &self,
        text: &str,
        tool_type: &ToolType,
        session_id: Option<&str>,
    ) -> Result<(), ClientError> {
        let shared = self.inner.lock();
        let outbound = match (shared.state, shared.outbound.as_ref()) {
            (ConnectionState::Open, Some(outbound)) => outbound,
            _ => return Err(ClientError::NotConnected),
        };

        let frame = ChatRequestFrame {
            message: text.to_string(),
            tool_type: tool_type.clone(),
            session_id: session_id.map(str::to_string),
        }
        .to_json()?;

        outbound.send(frame).map_err(|_| ClientError::NotConnected)?;
        debug!("Sent chat message ({} chars, tool {tool_type})", text.chars().count());
        Ok(())
    }

    /// Tears down the connection and cancels keep-alive and reconnect timers.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn reconnect_pending(&self) -> bool {
        self.inner.lock().reconnect.is_some()
    }
}

impl Drop for StreamingChatClient {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    async fn connect(self: &Arc<Self>) -> Result<(), ClientError> {
        let (user_id, generation, fallback) = {
            let mut shared = self.lock();
            if matches!(shared.state, ConnectionState::Open | ConnectionState::Connecting) {
                return Ok(());
            }
            let user_id = storage::user_id(&*self.storage).ok_or(ClientError::Authentication)?;
            let fallback = shared.state;
            shared.state = ConnectionState::Connecting;
            (user_id, shared.generation, fallback)
        };

        let url = self.config.chat_ws_url(&user_id);
        info!("Connecting to chat backend as user {user_id}");
        let timeout = self.config.connect_timeout;
        let attempt = tokio::time::timeout(timeout, self.connector.connect(&url)).await;

        let mut shared = self.lock();
        if shared.generation != generation {
            debug!("Connection attempt finished after close(), discarding it");
            return Err(ClientError::Closed);
        }
        let transport = match attempt {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                shared.state = fallback;
                warn!("Failed to connect: {e}");
                return Err(e);
            }
            Err(_) => {
                shared.state = fallback;
                warn!("Connection timed out after {timeout:?}");
                return Err(ClientError::ConnectionTimeout { after: timeout });
            }
        };
        self.install(&mut shared, transport, generation);
        Ok(())
    }

    fn install(self: &Arc<Self>, shared: &mut Shared, transport: Transport, generation: u64) {
        let Transport { outbound, inbound } = transport;
        shared.connection += 1;
        let connection = shared.connection;

        shared.state = ConnectionState::Open;
        shared.outbound = Some(outbound);
        shared.stop_keepalive();
        shared.keepalive = Some(tokio::spawn(keepalive_loop(
            Arc::downgrade(self),
            connection,
            self.config.keepalive_interval,
        )));
        if let Some(old) = shared.reader.take() {
            old.abort();
        }
        shared.reader = Some(tokio::spawn(read_loop(
            Arc::downgrade(self),
            inbound,
            generation,
            connection,
        )));
        info!("Chat connection open");
    }

    fn emit(&self, generation: u64, event: ChatEvent) {
        // The receiver only disappears together with the owning screen.
        let _ = self.events.send(Tagged { generation, event });
    }

    fn handle_peer_close(self: &Arc<Self>, generation: u64, connection: u64) {
        let mut shared = self.lock();
        if shared.generation != generation || shared.connection != connection {
            return;
        }
        info!("Chat connection closed by peer");
        shared.state = ConnectionState::Closed;
        shared.outbound = None;
        shared.reader = None;
        shared.stop_keepalive();
        self.schedule_reconnect(&mut shared);
    }

    fn schedule_reconnect(self: &Arc<Self>, shared: &mut Shared) {
        if shared.reconnect.is_some() {
            debug!("Reconnect already scheduled");
            return;
        }
        let delay = self.config.reconnect_delay;
        let generation = shared.generation;
        let weak = Arc::downgrade(self);
        info!("Reconnecting in {delay:?}");

        shared.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            {
                let mut shared = inner.lock();
                if shared.generation != generation {
                    return;
                }
                shared.reconnect = None;
            }
            info!("Attempting to reconnect");
            if let Err(e) = inner.connect().await {
                error!("Reconnect failed: {e}");
            }
        }));
    }

    fn close(&self) {
        let mut shared = self.lock();
        shared.generation += 1;
        let previous = shared.state;
        shared.state = ConnectionState::Idle;
        shared.outbound = None;
        shared.stop_keepalive();
        for handle in [shared.reader.take(), shared.reconnect.take()].into_iter().flatten() {
            handle.abort();
        }
        if previous != ConnectionState::Idle {
            info!("Chat connection closed by client");
        }
    }
}

async fn read_loop(
    inner: Weak<Inner>,
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
    generation: u64,
    connection: u64,
) {
    while let Some(event) = inbound.recv().await {
        let Some(client) = inner.upgrade() else { return };
        match event {
            TransportEvent::Text(text) => match decode_frame(&text) {
                Ok(Some(event)) => client.emit(generation, event),
                Ok(None) => {}
                Err(e) => warn!("Dropping inbound frame: {e}"),
            },
            TransportEvent::Error(message) => {
                error!("Chat transport error: {message}");
                client.emit(generation, ChatEvent::Error(format!("connection failed: {message}")));
            }
            TransportEvent::Closed => break,
        }
    }
    if let Some(client) = inner.upgrade() {
        client.handle_peer_close(generation, connection);
    }
}

async fn keepalive_loop(inner: Weak<Inner>, connection: u64, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let Some(client) = inner.upgrade() else { return };
        let shared = client.lock();
        if shared.state != ConnectionState::Open || shared.connection != connection {
            return;
        }
        let Some(outbound) = shared.outbound.as_ref() else { return };
        let Ok(ping) = ControlFrame::Ping.to_json() else { return };
        if outbound.send(ping).is_err() {
            return;
        }
        debug!("Sent keep-alive ping");
    }
}

impl ChatEvents {
    /// Next event of the live connection, skipping anything produced before
    /// the latest `close()`.
    pub async fn next(&mut self) -> Option<ChatEvent> {
        loop {
            let tagged = self.rx.recv().await?;
            if let Some(event) = self.accept(tagged)? {
                return Some(event);
            }
        }
    }

    /// Non-blocking variant of [`ChatEvents::next`].
    pub fn try_next(&mut self) -> Option<ChatEvent> {
        while let Ok(tagged) = self.rx.try_recv() {
            if let Some(event) = self.accept(tagged)? {
                return Some(event);
            }
        }
        None
    }

    /// Routes the next event to `listener`. Returns `false` once the stream ended.
    pub async fn dispatch_next<L: ChatListener + ?Sized>(&mut self, listener: &mut L) -> bool {
        match self.next().await {
            Some(event) => {
                event.dispatch(listener);
                true
            }
            None => false,
        }
    }

    /// `None` when the client is gone, `Some(None)` for a stale event.
    fn accept(&self, tagged: Tagged) -> Option<Option<ChatEvent>> {
        let current = self.inner.upgrade()?.generation();
        if tagged.generation == current {
            Some(Some(tagged.event))
        } else {
            debug!("Discarding event from a closed connection");
            Some(None)
        }
    }
}
