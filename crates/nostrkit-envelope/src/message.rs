//! Encrypting and decrypting event content.
//!
//! One recipient: the content key is the ECDH shared secret between sender
//! and recipient.
//!
//! Several recipients: the content key is `sha256(content)`, the same for
//! everyone, and each recipient's `p` tag carries that key wrapped with the
//! pairwise shared secret (see [`KeyShare`]).

use tracing::debug;

use nostrkit_core::tags::{Tag, PUBKEY_TAG};
use nostrkit_core::{Event, EventBuilder, Keypair, Kind, PublicKey, Sha256Hash, Tags};

use crate::crypto::{EncryptionKey, SharedSecret};
use crate::envelope::EncryptedContent;
use crate::error::{EnvelopeError, Result};
use crate::keyshare::KeyShare;

/// Index of the key share field in a `p` tag.
const SHARE_FIELD: usize = 3;

/// Encrypt `event`'s content from `keys` to `recipients`.
///
/// The event becomes an [`Kind::ENCRYPTED_MESSAGE`] authored by `keys`; any
/// previous id and signature are dropped, so sign it afterwards. Recipients
/// without a `p` tag get one.
pub fn encrypt(event: &mut Event, keys: &Keypair, recipients: &[PublicKey]) -> Result<()> {
    let plaintext = event.content_str().as_bytes().to_vec();

    let key = match recipients {
        [] => return Err(EnvelopeError::NoRecipientGiven),
        [recipient] => {
            ensure_recipient_tag(&mut event.tags, recipient);
            SharedSecret::derive(keys, recipient)?.to_encryption_key()
        }
        many => {
            let key = EncryptionKey::from_bytes(Sha256Hash::hash(&plaintext).0);
            for recipient in many {
                let shared = SharedSecret::derive(keys, recipient)?;
                let share = KeyShare::create(&key, &shared);
                let index = ensure_recipient_tag(&mut event.tags, recipient);
                if let Some(tag) = event.tags.get_mut(index) {
                    tag.set(SHARE_FIELD, share.to_base64());
                }
            }
            key
        }
    };

    let envelope = EncryptedContent::encrypt(&plaintext, &key);
    event.content = Some(envelope.to_wire());
    event.pubkey = Some(keys.public_key());
    event.kind = Some(Kind::ENCRYPTED_MESSAGE);
    event.unsign();

    debug!(recipients = recipients.len(), "encrypted event content");
    Ok(())
}

/// Decrypt `event`'s content with `keys`.
///
/// Works for any recipient named in a `p` tag, and for the sender (through
/// the first recipient's tag).
pub fn decrypt(event: &Event, keys: &Keypair) -> Result<String> {
    let sender = event.pubkey.ok_or(nostrkit_core::CoreError::OrphanEvent)?;
    let local = keys.public_key();

    let (tag, counterparty) = match recipient_index(&event.tags, &local) {
        Some(index) => (event.tags.get(index), sender),
        None if local == sender => {
            let tag = event
                .tags
                .find(PUBKEY_TAG)
                .ok_or(EnvelopeError::NoRecipientTag)?;
            let recipient = PublicKey::parse(tag.value().unwrap_or_default())?;
            (Some(tag), recipient)
        }
        None => return Err(EnvelopeError::NoRecipientTag),
    };

    let shared = SharedSecret::derive(keys, &counterparty)?;
    let key = match tag
        .and_then(|tag| tag.get(SHARE_FIELD))
        .and_then(KeyShare::from_base64)
    {
        Some(share) => share.decrypt(&shared),
        None => shared.to_encryption_key(),
    };

    EncryptedContent::parse(event.content_str())?.decrypt_to_string(&key)
}

/// Build, encrypt and sign a direct message.
pub fn encrypted_message(
    content: impl Into<String>,
    recipient: &PublicKey,
    keys: &Keypair,
) -> Result<Event> {
    let mut event = EventBuilder::new(Kind::ENCRYPTED_MESSAGE)
        .content(content)
        .build();
    encrypt(&mut event, keys, std::slice::from_ref(recipient))?;
    event.sign(keys)?;
    Ok(event)
}

fn recipient_index(tags: &Tags, pubkey: &PublicKey) -> Option<usize> {
    let hex = pubkey.to_hex();
    tags.iter()
        .position(|tag| tag.key() == Some(PUBKEY_TAG) && tag.value() == Some(hex.as_str()))
}

fn ensure_recipient_tag(tags: &mut Tags, pubkey: &PublicKey) -> usize {
    match recipient_index(tags, pubkey) {
        Some(index) => index,
        None => {
            let hex = pubkey.to_hex();
            tags.push(Tag::new([PUBKEY_TAG, hex.as_str()]));
            tags.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::tests::keypair;
    use proptest::prelude::*;

    #[test]
    fn test_single_recipient_roundtrip() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();

        let event = encrypted_message("hi bob, ça va? 🌶", &bob.public_key(), &alice).unwrap();
        assert_eq!(event.kind, Some(Kind::ENCRYPTED_MESSAGE));
        assert!(event.content_str().contains("?iv="));
        assert!(event.verify().unwrap());

        assert_eq!(decrypt(&event, &bob).unwrap(), "hi bob, ça va? 🌶");
        assert_eq!(decrypt(&event, &alice).unwrap(), "hi bob, ça va? 🌶");
    }

    #[test]
    fn test_single_recipient_has_no_share_field() {
        let alice = keypair(1);
        let bob = keypair(2);
        let event = encrypted_message("x", &bob.public_key(), &alice).unwrap();

        let tag = event.tags.find(PUBKEY_TAG).unwrap();
        assert_eq!(tag, &Tag::new(vec!["p".to_string(), bob.public_key().to_hex()]));
    }

    #[test]
    fn test_multi_recipient_roundtrip() {
        let alice = Keypair::generate();
        let recipients: Vec<Keypair> = (0..3).map(|_| Keypair::generate()).collect();
        let pubkeys: Vec<PublicKey> = recipients.iter().map(Keypair::public_key).collect();

        let mut event = EventBuilder::text_note("group secret ✓").build();
        encrypt(&mut event, &alice, &pubkeys).unwrap();
        event.sign(&alice).unwrap();

        assert_eq!(event.tags.find_all(PUBKEY_TAG).count(), 3);
        for keys in &recipients {
            assert_eq!(decrypt(&event, keys).unwrap(), "group secret ✓");
        }
        assert_eq!(decrypt(&event, &alice).unwrap(), "group secret ✓");
    }

    #[test]
    fn test_multi_recipient_reuses_existing_tag() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let carol = Keypair::generate();

        let mut event = EventBuilder::text_note("hello")
            .pubkey_reference(&bob.public_key(), "wss://relay.example.com")
            .build();
        encrypt(&mut event, &alice, &[bob.public_key(), carol.public_key()]).unwrap();

        let bob_tag = event.tags.get(0).unwrap();
        assert_eq!(bob_tag.get(2), Some("wss://relay.example.com"));
        assert!(KeyShare::from_base64(bob_tag.get(3).unwrap()).is_some());
        assert_eq!(event.tags.len(), 2);
        assert_eq!(decrypt(&event, &bob).unwrap(), "hello");
    }

    #[test]
    fn test_petname_field_is_not_a_share() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();

        let mut event = EventBuilder::text_note("legacy").build();
        event
            .tags
            .add_pubkey_reference(&bob.public_key().to_hex(), "", Some("bob"))
            .unwrap();
        encrypt(&mut event, &alice, &[bob.public_key()]).unwrap();

        assert_eq!(decrypt(&event, &bob).unwrap(), "legacy");
    }

    #[test]
    fn test_no_recipient_given() {
        let mut event = EventBuilder::text_note("nobody").build();
        assert!(matches!(
            encrypt(&mut event, &Keypair::generate(), &[]),
            Err(EnvelopeError::NoRecipientGiven)
        ));
    }

    #[test]
    fn test_outsider_has_no_recipient_tag() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let eve = Keypair::generate();

        let event = encrypted_message("private", &bob.public_key(), &alice).unwrap();
        assert!(matches!(
            decrypt(&event, &eve),
            Err(EnvelopeError::NoRecipientTag)
        ));
    }

    #[test]
    fn test_known_two_party_ciphertext() {
        let alice = keypair(1);
        let bob = keypair(2);
        let mut event = EventBuilder::new(Kind::ENCRYPTED_MESSAGE)
            .content("zjcTD9E2+Bt8x0/anzsAKg==?iv=AAECAwQFBgcICQoLDA0ODw==")
            .pubkey(alice.public_key())
            .build();
        event.tags.push(Tag::new(vec!["p".to_string(), bob.public_key().to_hex()]));

        assert_eq!(decrypt(&event, &bob).unwrap(), "hello nip04 ✓");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_roundtrip_any_text(content in "\\PC{0,200}", recipients in 1usize..4) {
            let alice = Keypair::generate();
            let others: Vec<Keypair> = (0..recipients).map(|_| Keypair::generate()).collect();
            let pubkeys: Vec<PublicKey> = others.iter().map(Keypair::public_key).collect();

            let mut event = EventBuilder::text_note(content.clone()).build();
            encrypt(&mut event, &alice, &pubkeys).unwrap();

            for keys in &others {
                prop_assert_eq!(&decrypt(&event, keys).unwrap(), &content);
            }
        }
    }
}
