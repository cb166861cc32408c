//! The Client: one identity talking to one relay.
//!
//! Brings together event building, encryption, proof of work and the relay
//! session behind a single handle.

use nostrkit_core::{
    mine, Event, EventBuilder, EventId, Filter, Keypair, Kind, Metadata, PublicKey,
};
use nostrkit_relay::{
    publish_once, Connector, MessageHandler, RelayClient, RelayMessage, SessionConfig,
    Subscription,
};
use tracing::{debug, info};

use crate::error::{NostrError, Result};

/// Configuration for the Client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Relay session configuration.
    pub session: SessionConfig,
    /// Leading zero bits mined into every event this client creates.
    /// Zero disables mining.
    pub pow_difficulty: u8,
}

/// A keypair bound to a relay.
pub struct Client<C: Connector> {
    keys: Keypair,
    relay: RelayClient<C>,
    config: ClientConfig,
    subscription: Option<Subscription>,
}

impl<C: Connector> Client<C> {
    /// Create a client with the default configuration.
    pub fn new(keys: Keypair, connector: C) -> Self {
        Self::with_config(keys, connector, ClientConfig::default())
    }

    /// Create a client with a custom configuration.
    pub fn with_config(keys: Keypair, connector: C, config: ClientConfig) -> Self {
        Self {
            keys,
            relay: RelayClient::with_config(connector, config.session.clone()),
            config,
            subscription: None,
        }
    }

    /// Get the client's public key.
    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    /// The public key as an `npub` address.
    pub fn npub(&self) -> String {
        self.keys.public_key().to_bech32()
    }

    pub fn keys(&self) -> &Keypair {
        &self.keys
    }

    pub fn relay(&self) -> &RelayClient<C> {
        &self.relay
    }

    /// The live subscription, if any.
    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Construction
    // ─────────────────────────────────────────────────────────────────────────

    /// A signed kind-1 text note.
    pub fn text_note(&self, content: impl Into<String>) -> Result<Event> {
        self.finish(EventBuilder::text_note(content).build())
    }

    /// A signed kind-0 profile update.
    pub fn set_metadata(&self, metadata: &Metadata) -> Result<Event> {
        self.finish(EventBuilder::metadata(metadata)?.build())
    }

    /// A signed kind-4 direct message to `recipient`.
    pub fn encrypted_message(
        &self,
        content: impl Into<String>,
        recipient: &PublicKey,
    ) -> Result<Event> {
        let mut event = EventBuilder::new(Kind::ENCRYPTED_MESSAGE)
            .content(content)
            .build();
        nostrkit_envelope::encrypt(&mut event, &self.keys, std::slice::from_ref(recipient))?;
        self.finish(event)
    }

    /// Decrypt a message sent to (or by) this client.
    pub fn decrypt(&self, event: &Event) -> Result<String> {
        Ok(nostrkit_envelope::decrypt(event, &self.keys)?)
    }

    /// Stamp, mine if configured, and sign.
    fn finish(&self, mut event: Event) -> Result<Event> {
        event.pubkey = Some(self.keys.public_key());
        if self.config.pow_difficulty > 0 {
            let nonce = mine(&mut event, self.config.pow_difficulty)?;
            debug!(nonce, difficulty = self.config.pow_difficulty, "mined event");
        }
        event.sign(&self.keys)?;
        Ok(event)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Relay Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the client's subscription. Returns its id.
    pub fn subscribe<H: MessageHandler>(
        &mut self,
        filter: &Filter,
        handler: H,
    ) -> Result<String> {
        let subscription = self.relay.subscribe(filter, handler)?;
        let id = subscription.id().to_string();
        self.subscription = Some(subscription);
        Ok(id)
    }

    /// Send `event` through the live subscription.
    ///
    /// Unsigned events are mined (if configured) and signed first.
    pub fn publish(&self, event: Event) -> Result<EventId> {
        let subscription = self.subscription.as_ref().ok_or(NostrError::NotSubscribed)?;
        let event = if event.is_signed() {
            event
        } else {
            self.finish(event)?
        };
        Ok(subscription.send_event(event, None)?)
    }

    /// Publish over a fresh connection and return the relay's reply.
    pub async fn publish_once(&self, event: &Event) -> Result<RelayMessage> {
        let reply =
            publish_once(self.relay.connector(), event, self.config.session.timeout).await?;
        Ok(reply)
    }

    /// Close the subscription and wait for its session to finish.
    pub async fn unsubscribe(&mut self) -> Result<()> {
        let subscription = self.subscription.take().ok_or(NostrError::NotSubscribed)?;
        subscription.unsubscribe()?;
        subscription.closed().await;
        info!(subscription = subscription.id(), "unsubscribed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostrkit_core::pow::{committed_difficulty, leading_zero_bits};
    use nostrkit_relay::MemoryRelay;

    fn client(pow_difficulty: u8) -> Client<MemoryRelay> {
        let config = ClientConfig {
            pow_difficulty,
            ..ClientConfig::default()
        };
        Client::with_config(Keypair::generate(), MemoryRelay::new(), config)
    }

    #[test]
    fn test_text_note_is_signed() {
        let client = client(0);
        let note = client.text_note("hello").unwrap();

        assert_eq!(note.kind, Some(Kind::TEXT_NOTE));
        assert_eq!(note.pubkey, Some(client.public_key()));
        assert!(note.verify().unwrap());
        assert!(client.npub().starts_with("npub1"));
    }

    #[test]
    fn test_pow_difficulty_mines_events() {
        let client = client(8);
        let note = client.text_note("work").unwrap();

        assert!(note.verify().unwrap());
        assert_eq!(committed_difficulty(&note), Some(8));
        assert!(leading_zero_bits(note.id().unwrap().as_bytes()) >= 8);
    }

    #[test]
    fn test_set_metadata() {
        let client = client(0);
        let metadata = Metadata::new("toons").about("hi");
        let event = client.set_metadata(&metadata).unwrap();

        assert_eq!(event.kind, Some(Kind::SET_METADATA));
        assert_eq!(Metadata::from_event(&event).unwrap(), metadata);
    }

    #[test]
    fn test_direct_message_between_clients() {
        let alice = client(0);
        let bob = client(0);

        let message = alice
            .encrypted_message("meet at noon", &bob.public_key())
            .unwrap();
        assert!(message.verify().unwrap());
        assert_eq!(bob.decrypt(&message).unwrap(), "meet at noon");
        assert_eq!(alice.decrypt(&message).unwrap(), "meet at noon");
    }

    #[test]
    fn test_publish_requires_subscription() {
        let client = client(0);
        let note = client.text_note("nowhere").unwrap();
        assert!(matches!(
            client.publish(note),
            Err(NostrError::NotSubscribed)
        ));
    }
}
