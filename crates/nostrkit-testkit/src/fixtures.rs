//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use serde_json::json;

use nostrkit_core::{Event, EventBuilder, Keypair, PublicKey};
use nostrkit_envelope::encrypted_message;
use nostrkit_relay::MemoryRelay;

/// Fixed timestamp for fixture events.
pub const FIXTURE_TIME: u64 = 1_700_000_000;

/// Deterministic keypair with secret scalar `n` (`n` must be non-zero).
pub fn keypair(n: u8) -> Keypair {
    let mut secret = [0u8; 32];
    secret[31] = n.max(1);
    Keypair::from_secret_bytes(&secret).expect("small non-zero scalars are valid secret keys")
}

/// A test fixture with a keypair and an in-memory relay.
pub struct TestFixture {
    pub keypair: Keypair,
    pub relay: MemoryRelay,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            relay: MemoryRelay::new(),
        }
    }

    /// Create with a deterministic keypair.
    pub fn with_scalar(n: u8) -> Self {
        Self {
            keypair: keypair(n),
            relay: MemoryRelay::new(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// A signed text note at [`FIXTURE_TIME`].
    pub fn note(&self, content: &str) -> Event {
        self.note_at(content, FIXTURE_TIME)
    }

    /// A signed text note at `created_at`.
    pub fn note_at(&self, content: &str, created_at: u64) -> Event {
        let mut event = EventBuilder::text_note(content)
            .created_at(created_at)
            .build();
        event
            .sign(&self.keypair)
            .expect("a tagless note always serializes");
        event
    }

    /// `count` distinct signed notes, one second apart.
    pub fn signed_batch(&self, count: usize) -> Vec<Event> {
        (0..count)
            .map(|i| self.note_at(&format!("note {i}"), FIXTURE_TIME + i as u64))
            .collect()
    }

    /// A signed direct message from this fixture to `recipient`.
    pub fn direct_message(&self, content: &str, recipient: &PublicKey) -> Event {
        encrypted_message(content, recipient, &self.keypair)
            .expect("encrypting to a valid key cannot fail")
    }

    /// Store `events` on the relay, in order.
    pub async fn seed_relay(&self, events: &[Event]) {
        for event in events {
            self.relay.store(event.clone()).await;
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: u8) -> Vec<TestFixture> {
    (1..=count).map(TestFixture::with_scalar).collect()
}

/// `["EVENT", subscription_id, event]`
pub fn event_frame(subscription_id: &str, event: &Event) -> String {
    json!(["EVENT", subscription_id, event]).to_string()
}

/// `["EOSE", subscription_id]`
pub fn eose_frame(subscription_id: &str) -> String {
    json!(["EOSE", subscription_id]).to_string()
}

/// `["NOTICE", message]`
pub fn notice_frame(message: &str) -> String {
    json!(["NOTICE", message]).to_string()
}

/// `["OK", event_id, accepted, message]`
pub fn ok_frame(event: &Event, accepted: bool, message: &str) -> String {
    let id = event.id().map(|id| id.to_hex()).unwrap_or_default();
    json!(["OK", id, accepted, message]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostrkit_relay::RelayMessage;

    #[test]
    fn test_fixture_notes_verify() {
        let fixture = TestFixture::with_scalar(7);
        let batch = fixture.signed_batch(3);

        assert_eq!(batch.len(), 3);
        for event in &batch {
            assert!(event.verify().unwrap());
            assert_eq!(event.pubkey, Some(fixture.public_key()));
        }
        assert_ne!(batch[0].id(), batch[1].id());
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        let pks: Vec<_> = parties.iter().map(|p| p.public_key()).collect();
        assert_ne!(pks[0], pks[1]);
        assert_ne!(pks[1], pks[2]);
        assert_ne!(pks[0], pks[2]);
        assert_eq!(pks[0], keypair(1).public_key());
    }

    #[test]
    fn test_frames_parse() {
        let fixture = TestFixture::with_scalar(1);
        let event = fixture.note("framed");

        assert!(matches!(
            RelayMessage::parse(&event_frame("sub", &event)).unwrap(),
            RelayMessage::Event { subscription_id, .. } if subscription_id == "sub"
        ));
        assert_eq!(
            RelayMessage::parse(&eose_frame("sub")).unwrap(),
            RelayMessage::EndOfStoredEvents("sub".into())
        );
        assert_eq!(
            RelayMessage::parse(&notice_frame("hi")).unwrap(),
            RelayMessage::Notice("hi".into())
        );
        assert!(matches!(
            RelayMessage::parse(&ok_frame(&event, true, "")).unwrap(),
            RelayMessage::Ok { accepted: true, .. }
        ));
    }

    #[test]
    fn test_direct_message_reaches_recipient() {
        let parties = multi_party_fixtures(2);
        let message = parties[0].direct_message("psst", &parties[1].public_key());

        assert!(message.verify().unwrap());
        assert_eq!(
            nostrkit_envelope::decrypt(&message, &parties[1].keypair).unwrap(),
            "psst"
        );
    }

    #[tokio::test]
    async fn test_seed_relay() {
        let fixture = TestFixture::new();
        let batch = fixture.signed_batch(4);
        fixture.seed_relay(&batch).await;
        assert_eq!(fixture.relay.stored().await, batch);
    }
}
