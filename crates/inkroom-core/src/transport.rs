//! Message transports for the sync bridge.
//!
//! A transport moves JSON text frames and nothing else; the bridge owns the
//! protocol. Inbound frames are collected and handed out by a non-blocking
//! [`Transport::poll_incoming`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Send failed: {0}")]
    Send(String),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// A bidirectional channel of text frames.
pub trait Transport {
    /// Queue a frame for delivery.
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Drain frames received since the last call (non-blocking).
    fn poll_incoming(&mut self) -> Vec<String>;

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Stop delivering and sending frames.
    fn close(&mut self);
}

// ============================================================================
// In-process hub
// ============================================================================

#[derive(Debug, Default)]
struct HubInner {
    inboxes: Vec<Option<VecDeque<String>>>,
}

/// An in-process relay: every frame sent by one endpoint is delivered to all
/// other open endpoints, in send order.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    inner: Rc<RefCell<HubInner>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new endpoint on the hub.
    pub fn connect(&self) -> MemoryTransport {
        let mut inner = self.inner.borrow_mut();
        inner.inboxes.push(Some(VecDeque::new()));
        MemoryTransport {
            hub: Rc::clone(&self.inner),
            slot: inner.inboxes.len() - 1,
        }
    }

    /// Number of open endpoints.
    pub fn endpoint_count(&self) -> usize {
        self.inner.borrow().inboxes.iter().filter(|inbox| inbox.is_some()).count()
    }
}

/// One endpoint of a [`MemoryHub`].
#[derive(Debug)]
pub struct MemoryTransport {
    hub: Rc<RefCell<HubInner>>,
    slot: usize,
}

impl MemoryTransport {
    fn is_open(&self) -> bool {
        self.hub
            .borrow()
            .inboxes
            .get(self.slot)
            .is_some_and(Option::is_some)
    }
}

impl Transport for MemoryTransport {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        let mut hub = self.hub.borrow_mut();
        for (slot, inbox) in hub.inboxes.iter_mut().enumerate() {
            if slot == self.slot {
                continue;
            }
            if let Some(inbox) = inbox {
                inbox.push_back(text.clone());
            }
        }
        Ok(())
    }

    fn poll_incoming(&mut self) -> Vec<String> {
        self.hub
            .borrow_mut()
            .inboxes
            .get_mut(self.slot)
            .and_then(Option::as_mut)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }

    fn state(&self) -> ConnectionState {
        if self.is_open() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn close(&mut self) {
        if let Some(inbox) = self.hub.borrow_mut().inboxes.get_mut(self.slot) {
            *inbox = None;
        }
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Native WebSocket
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// Events from the WebSocket thread.
    enum WsEvent {
        Connected,
        Disconnected,
        Failed(String),
        Text(String),
    }

    /// WebSocket client for native platforms.
    ///
    /// Uses a background thread for non-blocking operation.
    pub struct WebSocketTransport {
        state: ConnectionState,
        inbox: Vec<String>,
        /// Channel to send commands to the WebSocket thread.
        cmd_tx: Option<Sender<WsCommand>>,
        /// Channel to receive events from the WebSocket thread.
        event_rx: Option<Receiver<WsEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl WebSocketTransport {
        /// Create a new disconnected client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                inbox: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay, e.g. `ws://localhost:3030/ws?userId=u1&username=Ada`.
        pub fn connect(&mut self, url: &str) -> Result<(), TransportError> {
            if self.cmd_tx.is_some() {
                return Err(TransportError::AlreadyConnected);
            }

            let parsed_url = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme {}",
                    parsed_url.scheme()
                )));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<WsEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("WebSocket thread: connecting to {}", url);

                let (mut socket, response) = match connect(&url) {
                    Ok(connected) => connected,
                    Err(e) => {
                        log::error!("WebSocket connection failed: {}", e);
                        let _ = event_tx.send(WsEvent::Failed(e.to_string()));
                        return;
                    }
                };
                log::info!("WebSocket connected, status: {}", response.status());
                let _ = event_tx.send(WsEvent::Connected);

                // Short read timeout so the loop can service outgoing commands
                if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
                    let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                    let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                }

                loop {
                    match cmd_rx.try_recv() {
                        Ok(WsCommand::Send(msg)) => {
                            log::debug!("WebSocket sending: {}", preview(&msg));
                            if let Err(e) = socket.send(Message::text(msg)) {
                                log::error!("WebSocket send error: {}", e);
                                break;
                            }
                        }
                        Ok(WsCommand::Close) => {
                            log::info!("WebSocket close requested");
                            let _ = socket.close(None);
                            break;
                        }
                        Err(TryRecvError::Disconnected) => {
                            log::info!("WebSocket command channel disconnected");
                            break;
                        }
                        Err(TryRecvError::Empty) => {}
                    }

                    match socket.read() {
                        Ok(Message::Text(txt)) => {
                            log::debug!("WebSocket received: {}", preview(&txt));
                            let _ = event_tx.send(WsEvent::Text(txt.to_string()));
                        }
                        Ok(Message::Ping(data)) => {
                            let _ = socket.send(Message::Pong(data));
                        }
                        Ok(Message::Close(_)) => {
                            log::info!("WebSocket received close frame");
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e))
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue;
                        }
                        Err(e) => {
                            log::error!("WebSocket read error: {}", e);
                            break;
                        }
                    }
                }

                log::info!("WebSocket thread exiting");
                let _ = event_tx.send(WsEvent::Disconnected);
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        fn drain_events(&mut self) {
            let Some(rx) = &self.event_rx else {
                return;
            };
            while let Ok(event) = rx.try_recv() {
                match event {
                    WsEvent::Connected => self.state = ConnectionState::Connected,
                    WsEvent::Disconnected => self.state = ConnectionState::Disconnected,
                    WsEvent::Failed(message) => {
                        log::warn!("WebSocket unavailable: {}", message);
                        self.state = ConnectionState::Error;
                    }
                    WsEvent::Text(text) => self.inbox.push(text),
                }
            }
        }
    }

    impl Default for WebSocketTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for WebSocketTransport {
        fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            match &self.cmd_tx {
                Some(tx) => tx
                    .send(WsCommand::Send(text))
                    .map_err(|e| TransportError::Send(e.to_string())),
                None => Err(TransportError::NotConnected),
            }
        }

        fn poll_incoming(&mut self) -> Vec<String> {
            self.drain_events();
            std::mem::take(&mut self.inbox)
        }

        fn state(&self) -> ConnectionState {
            self.state
        }

        fn close(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.inbox.clear();
            self.state = ConnectionState::Disconnected;
        }
    }

    impl Drop for WebSocketTransport {
        fn drop(&mut self) {
            self.close();
        }
    }

    fn preview(msg: &str) -> &str {
        let end = msg.char_indices().nth(100).map_or(msg.len(), |(i, _)| i);
        &msg[..end]
    }

}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::WebSocketTransport;
