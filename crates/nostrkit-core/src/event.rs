//! Event: the signed, timestamped, typed protocol message.
//!
//! The id and signature are derived values. They are private and only set by
//! [`Event::identify`] and [`Event::sign`]; any later change to the public
//! fields leaves them stale until the event is identified or signed again.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_bytes;
use crate::crypto::{Keypair, PublicKey, Sha256Hash, Signature};
use crate::error::{CoreError, Result};
use crate::metadata::Metadata;
use crate::tags::{Marker, Tag, Tags, EVENT_TAG, PUBKEY_TAG};
use crate::types::{unix_now, EventId, Kind};

/// A protocol event in its NIP-01 JSON object form.
///
/// `pubkey`, `created_at`, `kind` and `content` are optional so that a partly
/// built event can exist; completeness is checked when it is serialized for
/// hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<EventId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,

    #[serde(default)]
    pub tags: Tags,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sig: Option<Signature>,
}

impl Event {
    /// The stored id, if the event has been identified.
    pub fn id(&self) -> Option<EventId> {
        self.id
    }

    /// The stored signature, if the event has been signed.
    pub fn sig(&self) -> Option<Signature> {
        self.sig
    }

    pub fn is_signed(&self) -> bool {
        self.sig.is_some()
    }

    /// Content, or the empty string when unset.
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Compute the id from the current fields without storing it.
    pub fn compute_id(&self) -> Result<EventId> {
        let bytes = canonical_bytes(self)?;
        Ok(EventId(Sha256Hash::hash(&bytes).0))
    }

    /// Set `id` to the digest of the canonical body.
    pub fn identify(&mut self) -> Result<EventId> {
        let id = self.compute_id()?;
        self.id = Some(id);
        Ok(id)
    }

    /// Set `pubkey` from the keypair, identify, and sign the id.
    pub fn sign(&mut self, keys: &Keypair) -> Result<()> {
        self.pubkey = Some(keys.public_key());
        let id = self.identify()?;
        self.sig = Some(keys.sign(id.as_bytes()));
        Ok(())
    }

    /// Check the stored id against the current fields, then the signature.
    ///
    /// A stale id, or a signature with no id, is an
    /// [`CoreError::IntegrityError`]. An unsigned event is not genuine and
    /// yields `Ok(false)`.
    pub fn verify(&self) -> Result<bool> {
        let actual = self.compute_id()?;
        match self.id {
            Some(expected) if expected != actual => {
                return Err(CoreError::IntegrityError {
                    expected: expected.to_hex(),
                    actual: actual.to_hex(),
                });
            }
            None if self.sig.is_some() => {
                return Err(CoreError::IntegrityError {
                    expected: "none".into(),
                    actual: actual.to_hex(),
                });
            }
            _ => {}
        }

        let (Some(sig), Some(pubkey)) = (self.sig, self.pubkey) else {
            return Ok(false);
        };
        Ok(pubkey.verify(actual.as_bytes(), &sig).is_ok())
    }

    /// Drop the id and signature, e.g. after changing the body.
    pub fn unsign(&mut self) {
        self.id = None;
        self.sig = None;
    }

    /// Serialize to the NIP-01 JSON object.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a NIP-01 JSON object. The id and signature are taken as given;
    /// call [`Event::verify`] before trusting them.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Builder for creating events.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    kind: Kind,
    content: String,
    created_at: Option<u64>,
    pubkey: Option<PublicKey>,
    tags: Tags,
}

impl EventBuilder {
    /// Start building an event of the given kind.
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            content: String::new(),
            created_at: None,
            pubkey: None,
            tags: Tags::new(),
        }
    }

    /// A kind-1 text note.
    pub fn text_note(content: impl Into<String>) -> Self {
        Self::new(Kind::TEXT_NOTE).content(content)
    }

    /// A kind-0 profile update carrying `metadata` as JSON content.
    pub fn metadata(metadata: &Metadata) -> Result<Self> {
        Ok(Self::new(Kind::SET_METADATA).content(metadata.to_content()?))
    }

    /// A kind-2 relay recommendation.
    pub fn recommend_relay(url: impl Into<String>) -> Self {
        Self::new(Kind::RECOMMEND_RELAY).content(url)
    }

    /// Set the content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the timestamp (defaults to now at build time).
    pub fn created_at(mut self, ts: u64) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Set the author; [`EventBuilder::sign`] sets it from the keypair.
    pub fn pubkey(mut self, pubkey: PublicKey) -> Self {
        self.pubkey = Some(pubkey);
        self
    }

    /// Append a tag.
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Append several tags.
    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        for tag in tags {
            self.tags.push(tag);
        }
        self
    }

    /// Reference another event.
    pub fn event_reference(
        mut self,
        id: &EventId,
        relay_hint: &str,
        marker: Option<Marker>,
    ) -> Self {
        let id = id.to_hex();
        let mut tag = Tag::new([EVENT_TAG, id.as_str(), relay_hint]);
        if let Some(marker) = marker {
            tag.0.push(marker.as_str().to_string());
        }
        self.tags.push(tag);
        self
    }

    /// Reference a public key.
    pub fn pubkey_reference(mut self, pubkey: &PublicKey, relay_hint: &str) -> Self {
        let pubkey = pubkey.to_hex();
        self.tags
            .push(Tag::new([PUBKEY_TAG, pubkey.as_str(), relay_hint]));
        self
    }

    /// Build the unsigned event.
    pub fn build(self) -> Event {
        Event {
            id: None,
            pubkey: self.pubkey,
            created_at: Some(self.created_at.unwrap_or_else(unix_now)),
            kind: Some(self.kind),
            tags: self.tags,
            content: Some(self.content),
            sig: None,
        }
    }

    /// Build and sign the event.
    pub fn sign(self, keys: &Keypair) -> Result<Event> {
        let mut event = self.build();
        event.sign(keys)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_ID: &str = "b6d5d773da3a64b5d4f49bf2197c5d711f0570a4005426a3db2e507286ee689e";

    fn key_one() -> Keypair {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        Keypair::from_secret_bytes(&secret).unwrap()
    }

    fn hello(keys: &Keypair) -> Event {
        EventBuilder::text_note("Hello nostr !")
            .created_at(1_700_000_000)
            .sign(keys)
            .unwrap()
    }

    #[test]
    fn test_hello_nostr_id_and_signature() {
        let keys = key_one();
        let event = hello(&keys);

        assert_eq!(event.id().unwrap().to_hex(), HELLO_ID);
        assert_eq!(event.pubkey, Some(keys.public_key()));
        assert!(event.verify().unwrap());
    }

    #[test]
    fn test_identify_then_verify_integrity() {
        let mut event = EventBuilder::text_note("unsigned")
            .pubkey(key_one().public_key())
            .build();
        event.identify().unwrap();

        assert!(!event.verify().unwrap());
    }

    #[test]
    fn test_mutation_breaks_integrity() {
        let mut event = hello(&key_one());
        event.content = Some("Hello nostr ?".into());

        assert!(matches!(
            event.verify(),
            Err(CoreError::IntegrityError { .. })
        ));
    }

    #[test]
    fn test_signature_without_id_fails_integrity() {
        let json = hello(&key_one()).to_json().unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value.as_object_mut().unwrap().remove("id");

        let parsed = Event::from_json(&value.to_string()).unwrap();
        assert_eq!(parsed.id(), None);
        assert!(parsed.is_signed());
        assert!(matches!(
            parsed.verify(),
            Err(CoreError::IntegrityError { .. })
        ));
    }

    #[test]
    fn test_signature_from_other_key_fails() {
        let mut event = hello(&key_one());
        event.pubkey = Some(Keypair::generate().public_key());
        event.identify().unwrap();

        assert!(!event.verify().unwrap());
    }

    #[test]
    fn test_unsign_clears_derived_fields() {
        let mut event = hello(&key_one());
        event.unsign();
        assert_eq!(event.id(), None);
        assert!(!event.is_signed());
        assert!(!event.verify().unwrap());
    }

    #[test]
    fn test_json_roundtrip_preserves_signature() {
        let event = hello(&key_one());
        let json = event.to_json().unwrap();
        assert!(json.starts_with(&format!("{{\"id\":\"{HELLO_ID}\"")));

        let parsed = Event::from_json(&json).unwrap();
        assert_eq!(parsed, event);
        assert!(parsed.verify().unwrap());
    }

    #[test]
    fn test_builder_defaults_created_at_to_now() {
        let before = unix_now();
        let event = EventBuilder::text_note("now").build();
        assert!(event.created_at.unwrap() >= before);
        assert_eq!(event.kind, Some(Kind::TEXT_NOTE));
        assert_eq!(event.pubkey, None);
    }

    #[test]
    fn test_builder_references() {
        let keys = key_one();
        let parent = hello(&keys);
        let event = EventBuilder::text_note("reply")
            .event_reference(&parent.id().unwrap(), "", Some(Marker::Reply))
            .pubkey_reference(&keys.public_key(), "wss://relay.example.com")
            .sign(&keys)
            .unwrap();

        assert_eq!(event.tags.references(HELLO_ID), Some(0));
        assert_eq!(event.tags.get(0).unwrap().get(3), Some("reply"));
        assert_eq!(event.tags.references(&keys.public_key().to_hex()), Some(1));
    }

    #[test]
    fn test_relay_event_parses() {
        let json = format!(
            r#"{{"id":"{HELLO_ID}","pubkey":"{}","created_at":1700000000,"kind":1,"tags":[],"content":"Hello nostr !","sig":"{}"}}"#,
            key_one().public_key().to_hex(),
            hello(&key_one()).sig().unwrap().to_hex(),
        );
        let event = Event::from_json(&json).unwrap();
        assert!(event.verify().unwrap());
    }
}
