//! # nostrkit
//!
//! Client-side toolkit for the Nostr protocol: build, sign and verify events,
//! exchange encrypted direct messages, stamp events with proof of work and
//! keep a subscription open against a relay.
//!
//! ## Overview
//!
//! - **Events**: canonical serialization, SHA-256 ids, BIP-340 signatures
//! - **Addresses**: bech32 `npub` / `nsec` / `note`
//! - **Envelope**: ECDH + AES-256-CBC direct messages, single or multi recipient
//! - **Proof of work**: nonce mining against a leading-zero-bit target
//! - **Relay session**: one reconnecting, deduplicating subscription per client
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nostrkit::{Client, Filter, Keypair, Kind, WebSocketConnector};
//! use nostrkit::relay::Delivery;
//!
//! async fn example() -> nostrkit::Result<()> {
//!     let connector = WebSocketConnector::new("wss://relay.example.com")?;
//!     let mut client = Client::new(Keypair::generate(), connector);
//!
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!     client.subscribe(&Filter::new().kind(Kind::TEXT_NOTE).limit(20), tx)?;
//!
//!     let note = client.text_note("hello nostr")?;
//!     client.publish(note)?;
//!
//!     if let Some(Delivery::Event(event)) = rx.recv().await {
//!         println!("{}", event.content_str());
//!     }
//!     client.unsubscribe().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `nostrkit::core` - Events, keys, bech32, filters, proof of work
//! - `nostrkit::envelope` - Encrypted direct messages
//! - `nostrkit::relay` - Relay sessions and transports

pub mod client;
pub mod error;

// Re-export component crates
pub use nostrkit_core as core;
pub use nostrkit_envelope as envelope;
pub use nostrkit_relay as relay;

// Re-export main types for convenience
pub use client::{Client, ClientConfig};
pub use error::{NostrError, Result};

// Re-export commonly used types
pub use nostrkit_core::{
    AddressKind, Event, EventBuilder, EventId, Filter, Keypair, Kind, Marker, Metadata,
    PublicKey, Signature, Tag, Tags,
};
pub use nostrkit_relay::{MemoryRelay, SessionConfig, Subscription, WebSocketConnector};
