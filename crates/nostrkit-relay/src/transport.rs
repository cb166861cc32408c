//! Transport abstraction for relay sessions.
//!
//! A [`Connector`] opens connections; a [`Transport`] moves text frames over
//! one of them. The session owns exactly one transport at a time and
//! reconnects through the connector when it fails.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// One open connection to a relay.
#[async_trait]
pub trait Transport: Send {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> Result<()>;

    /// Receive the next text frame.
    ///
    /// Returns `None` if `timeout` expires first, and
    /// [`SessionError::TransportClosed`](crate::SessionError::TransportClosed)
    /// once the relay has gone away. Must be cancel safe: the session drops
    /// the future when an outbound request arrives.
    async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Opens connections to one relay.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced.
    type Transport: Transport + 'static;

    /// Open a new connection.
    async fn connect(&self) -> Result<Self::Transport>;

    /// Relay address, for logging.
    fn url(&self) -> &str;
}

/// A scripted in-process relay for tests.
///
/// Stores every event it is sent, replays the store to each `REQ` followed
/// by `EOSE`, answers `EVENT` with `OK` and fans new events out to open
/// subscriptions. No filter matching is done.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex};
    use tracing::debug;

    use nostrkit_core::Event;

    use crate::error::SessionError;
    use crate::messages::ClientMessage;

    /// Shared state for the relay and all of its connections.
    #[derive(Default)]
    struct RelayState {
        /// Events in arrival order.
        stored: Vec<Event>,
        /// Every frame received from any client.
        received: Vec<String>,
        /// Outbound channel per open connection.
        links: HashMap<u64, mpsc::UnboundedSender<String>>,
        /// Active subscription id per connection.
        subscriptions: HashMap<u64, String>,
        next_link: u64,
        /// Connections accepted so far.
        accepted: usize,
        refusing: bool,
    }

    impl RelayState {
        fn deliver(&self, link: u64, frame: String) {
            if let Some(tx) = self.links.get(&link) {
                // A dropped connection is discovered on its next send.
                let _ = tx.send(frame);
            }
        }
    }

    /// In-memory relay. Clones share the same state.
    #[derive(Clone, Default)]
    pub struct MemoryRelay {
        state: Arc<Mutex<RelayState>>,
    }

    impl MemoryRelay {
        /// Create an empty relay.
        pub fn new() -> Self {
            Self::default()
        }

        /// Add an event to the store without notifying anyone.
        pub async fn store(&self, event: Event) {
            self.state.lock().await.stored.push(event);
        }

        /// Send a raw frame to every open connection.
        pub async fn push(&self, frame: impl Into<String>) {
            let frame = frame.into();
            let state = self.state.lock().await;
            for link in state.links.keys() {
                state.deliver(*link, frame.clone());
            }
        }

        /// Drop every open connection; their transports report closed.
        pub async fn disconnect_all(&self) {
            let mut state = self.state.lock().await;
            state.links.clear();
            state.subscriptions.clear();
        }

        /// Refuse (or accept again) new connections.
        pub async fn set_refusing(&self, refusing: bool) {
            self.state.lock().await.refusing = refusing;
        }

        /// Every frame received so far, in order.
        pub async fn received(&self) -> Vec<String> {
            self.state.lock().await.received.clone()
        }

        /// Received frames that parse as client messages.
        pub async fn received_messages(&self) -> Vec<ClientMessage> {
            self.received()
                .await
                .iter()
                .filter_map(|frame| ClientMessage::from_json(frame).ok())
                .collect()
        }

        /// Events stored so far.
        pub async fn stored(&self) -> Vec<Event> {
            self.state.lock().await.stored.clone()
        }

        /// Number of connections accepted since creation.
        pub async fn connections(&self) -> usize {
            self.state.lock().await.accepted
        }

        /// Number of currently open connections.
        pub async fn open_connections(&self) -> usize {
            self.state.lock().await.links.len()
        }

        async fn handle(&self, link: u64, frame: String) -> Result<()> {
            let mut state = self.state.lock().await;
            if !state.links.contains_key(&link) {
                return Err(SessionError::TransportClosed);
            }
            state.received.push(frame.clone());

            match ClientMessage::from_json(&frame) {
                Ok(ClientMessage::Req {
                    subscription_id, ..
                }) => {
                    for event in &state.stored {
                        let reply = serde_json::to_string(&("EVENT", &subscription_id, event))?;
                        state.deliver(link, reply);
                    }
                    state.deliver(link, serde_json::to_string(&("EOSE", &subscription_id))?);
                    state.subscriptions.insert(link, subscription_id);
                }
                Ok(ClientMessage::Event(event)) => {
                    let accepted = event.verify().unwrap_or(false);
                    let id = event.id().map(|id| id.to_hex()).unwrap_or_default();
                    let message = if accepted { "" } else { "invalid: bad signature" };
                    state.deliver(link, serde_json::to_string(&("OK", &id, accepted, message))?);

                    if accepted {
                        for (other, subscription_id) in &state.subscriptions {
                            let reply =
                                serde_json::to_string(&("EVENT", subscription_id, &event))?;
                            state.deliver(*other, reply);
                        }
                        state.stored.push(event);
                    }
                }
                Ok(ClientMessage::Close(subscription_id)) => {
                    state.subscriptions.remove(&link);
                    state.deliver(link, serde_json::to_string(&("CLOSED", &subscription_id, ""))?);
                }
                Err(e) => {
                    debug!(link, error = %e, "memory relay got an unparseable frame");
                    state.deliver(link, serde_json::to_string(&("NOTICE", e.to_string()))?);
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Connector for MemoryRelay {
        type Transport = MemoryTransport;

        async fn connect(&self) -> Result<MemoryTransport> {
            let mut state = self.state.lock().await;
            if state.refusing {
                return Err(SessionError::Transport("connection refused".into()));
            }

            let (tx, rx) = mpsc::unbounded_channel();
            let link = state.next_link;
            state.next_link += 1;
            state.accepted += 1;
            state.links.insert(link, tx);

            Ok(MemoryTransport {
                link,
                inbox: rx,
                relay: self.clone(),
            })
        }

        fn url(&self) -> &str {
            "memory://relay"
        }
    }

    /// One connection to a [`MemoryRelay`].
    pub struct MemoryTransport {
        link: u64,
        inbox: mpsc::UnboundedReceiver<String>,
        relay: MemoryRelay,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&mut self, frame: String) -> Result<()> {
            self.relay.handle(self.link, frame).await
        }

        async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<String>> {
            match tokio::time::timeout(timeout, self.inbox.recv()).await {
                Ok(Some(frame)) => Ok(Some(frame)),
                Ok(None) => Err(SessionError::TransportClosed),
                Err(_) => Ok(None),
            }
        }

        async fn close(&mut self) -> Result<()> {
            let mut state = self.relay.state.lock().await;
            state.links.remove(&self.link);
            state.subscriptions.remove(&self.link);
            Ok(())
        }
    }
}

/// WebSocket transport over tokio-tungstenite.
pub mod websocket {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio::time::Instant;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
    use tracing::debug;
    use url::Url;

    use crate::error::SessionError;

    /// Connects to a `ws://` or `wss://` relay.
    #[derive(Debug, Clone)]
    pub struct WebSocketConnector {
        url: Url,
    }

    impl WebSocketConnector {
        /// Validate `url` and build a connector for it.
        pub fn new(url: &str) -> Result<Self> {
            let parsed =
                Url::parse(url).map_err(|e| SessionError::InvalidUrl(format!("{url}: {e}")))?;
            match parsed.scheme() {
                "ws" | "wss" => Ok(Self { url: parsed }),
                scheme => Err(SessionError::InvalidUrl(format!(
                    "{url}: unsupported scheme {scheme:?}"
                ))),
            }
        }
    }

    #[async_trait]
    impl Connector for WebSocketConnector {
        type Transport = WebSocketTransport;

        async fn connect(&self) -> Result<WebSocketTransport> {
            let (stream, _) = connect_async(self.url.as_str())
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))?;
            Ok(WebSocketTransport { stream })
        }

        fn url(&self) -> &str {
            self.url.as_str()
        }
    }

    /// An open WebSocket connection.
    pub struct WebSocketTransport {
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    }

    #[async_trait]
    impl Transport for WebSocketTransport {
        async fn send(&mut self, frame: String) -> Result<()> {
            self.stream
                .send(Message::text(frame))
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))
        }

        async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<String>> {
            let deadline = Instant::now() + timeout;
            loop {
                let Ok(next) = tokio::time::timeout_at(deadline, self.stream.next()).await else {
                    return Ok(None);
                };
                match next {
                    Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(SessionError::TransportClosed)
                    }
                    // Pings are answered by tungstenite on the next read or write.
                    Some(Ok(other)) => {
                        debug!(len = other.len(), "ignoring non-text websocket frame");
                    }
                    Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
                }
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.stream
                .close(None)
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))
        }
    }
}
