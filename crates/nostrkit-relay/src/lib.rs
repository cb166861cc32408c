//! # nostrkit relay
//!
//! Relay session client: one subscription kept alive over a reconnecting
//! transport, with deduplicated, verified delivery.
//!
//! ## Overview
//!
//! [`RelayClient::subscribe`] opens a session and returns a [`Subscription`].
//! The session survives idle timeouts and dropped connections by reconnecting
//! and re-sending the same `REQ`; events the relay replays are filtered out
//! by a window of recently seen ids sized to the filter's `limit`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nostrkit_core::{Filter, Kind};
//! use nostrkit_relay::{Delivery, RelayClient, WebSocketConnector};
//!
//! async fn example() -> nostrkit_relay::Result<()> {
//!     let client = RelayClient::new(WebSocketConnector::new("wss://relay.example.com")?);
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!     let subscription = client.subscribe(&Filter::new().kind(Kind::TEXT_NOTE), tx)?;
//!
//!     while let Some(Delivery::Event(event)) = rx.recv().await {
//!         println!("{}", event.content_str());
//!     }
//!     subscription.unsubscribe()
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Client                              Relay
//!   |-------- REQ id filter ---------->|
//!   |<------- EVENT id event ----------|  (stored events)
//!   |<------- EOSE id -----------------|
//!   |-------- EVENT event ------------>|
//!   |<------- OK event_id true "" -----|
//!   |<------- EVENT id event ----------|  (live events)
//!   |-------- CLOSE id --------------->|
//! ```

pub mod dedup;
pub mod error;
pub mod messages;
pub mod session;
pub mod transport;

pub use dedup::DedupWindow;
pub use error::{Result, SessionError};
pub use messages::{new_subscription_id, ClientMessage, RelayMessage};
pub use session::{
    publish_once, Delivery, MessageHandler, RelayClient, SessionConfig, Subscription,
};
pub use transport::memory::{MemoryRelay, MemoryTransport};
pub use transport::websocket::{WebSocketConnector, WebSocketTransport};
pub use transport::{Connector, Transport};
