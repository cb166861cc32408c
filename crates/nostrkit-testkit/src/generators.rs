//! Proptest generators for property-based testing.

use proptest::prelude::*;

use nostrkit_core::{Event, EventBuilder, EventId, Keypair, Kind, PublicKey, Tag};

/// Generate a random keypair. Rejects the (vanishingly rare) invalid scalars.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_filter_map("invalid secret key", |bytes| {
        Keypair::from_secret_bytes(&bytes).ok()
    })
}

/// Generate a random public key.
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    keypair().prop_map(|keys| keys.public_key())
}

/// Generate a random EventId.
pub fn event_id() -> impl Strategy<Value = EventId> {
    any::<[u8; 32]>().prop_map(EventId::from_bytes)
}

/// Generate one of the kinds this crate names.
pub fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::SET_METADATA),
        Just(Kind::TEXT_NOTE),
        Just(Kind::RECOMMEND_RELAY),
        Just(Kind::ENCRYPTED_MESSAGE),
    ]
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = u64> {
    0u64..=4_102_444_800
}

/// Arbitrary printable text, including multi-byte characters.
pub fn content(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..=max_len).prop_map(|chars| chars.into_iter().collect())
}

/// Generate a non-empty tag.
pub fn tag() -> impl Strategy<Value = Tag> {
    ("[a-z]{1,2}", prop::collection::vec("\\PC{0,16}", 0..4)).prop_map(|(key, values)| {
        let mut fields = vec![key];
        fields.extend(values);
        Tag(fields)
    })
}

/// Generate a bech32 payload of `1..=max_len` bytes.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len)
}

/// Parameters for generating an event.
#[derive(Debug, Clone)]
pub struct EventParams {
    pub keypair: Keypair,
    pub created_at: u64,
    pub kind: Kind,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl Arbitrary for EventParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            keypair(),
            timestamp(),
            kind(),
            prop::collection::vec(tag(), 0..4),
            content(64),
        )
            .prop_map(|(keypair, created_at, kind, tags, content)| EventParams {
                keypair,
                created_at,
                kind,
                tags,
                content,
            })
            .boxed()
    }
}

/// Build the unsigned event described by `params`.
pub fn event_from_params(params: &EventParams) -> Event {
    EventBuilder::new(params.kind)
        .created_at(params.created_at)
        .pubkey(params.keypair.public_key())
        .tags(params.tags.iter().cloned())
        .content(params.content.clone())
        .build()
}

/// Build and sign the event described by `params`.
pub fn signed_event_from_params(params: &EventParams) -> Event {
    let mut event = event_from_params(params);
    event
        .sign(&params.keypair)
        .expect("generated tags are never empty");
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostrkit_core::bech32::{decode, encode};
    use nostrkit_core::AddressKind;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_identify_then_verify_never_fails_integrity(params: EventParams) {
            let mut event = event_from_params(&params);
            event.identify().unwrap();
            prop_assert!(event.verify().is_ok());
        }

        #[test]
        fn prop_signed_verifies_and_other_key_fails(params: EventParams, other in keypair()) {
            let event = signed_event_from_params(&params);
            prop_assert!(event.verify().unwrap());

            let id = event.id().unwrap();
            let sig = event.sig().unwrap();
            prop_assert!(params.keypair.public_key().verify(id.as_bytes(), &sig).is_ok());
            if other.public_key() != params.keypair.public_key() {
                prop_assert!(other.public_key().verify(id.as_bytes(), &sig).is_err());
            }
        }

        #[test]
        fn prop_event_json_round_trip(params: EventParams) {
            let event = signed_event_from_params(&params);
            let parsed = Event::from_json(&event.to_json().unwrap()).unwrap();
            prop_assert_eq!(parsed, event);
        }

        #[test]
        fn prop_bech32_round_trip_all_prefixes(data in payload(512)) {
            for kind in AddressKind::ALL {
                let encoded = encode(kind.prefix(), &data).unwrap();
                let (hrp, decoded) = decode(&encoded).unwrap();
                prop_assert_eq!(hrp, kind.prefix());
                prop_assert_eq!(&decoded, &data);
            }
        }
    }
}
