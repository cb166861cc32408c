//! Golden test vectors for deterministic verification.
//!
//! Each vector fixes an event body and the id every implementation must
//! derive from it. All are authored by the key with secret scalar 1.

use nostrkit_core::{canonical_string, Event, EventBuilder, Keypair, Kind, Tag};

/// Secret key of every vector's author (scalar 1).
pub const AUTHOR_SECRET: &str = "0000000000000000000000000000000000000000000000000000000000000001";

/// Public key of the author: the x coordinate of G.
pub const AUTHOR_PUBKEY: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// The author's `npub` address.
pub const AUTHOR_NPUB: &str = "npub10xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqpkge6d";

/// The author's `nsec` address.
pub const AUTHOR_NSEC: &str = "nsec1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqsmhltgl";

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub created_at: u64,
    pub kind: Kind,
    pub tags: &'static [&'static [&'static str]],
    pub content: &'static str,
    /// Expected event id (hex).
    pub expected_id: &'static str,
    /// Expected `note` address, where one was computed.
    pub expected_note: Option<&'static str>,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "plain text note",
            created_at: 1_700_000_000,
            kind: Kind::TEXT_NOTE,
            tags: &[],
            content: "Hello nostr !",
            expected_id: "b6d5d773da3a64b5d4f49bf2197c5d711f0570a4005426a3db2e507286ee689e",
            expected_note: Some("note1km2awu768fjtt485n0epjlzawy0s2u9yqp2zdg7m9eg89phwdz0qmrtufh"),
        },
        GoldenVector {
            name: "reply with event and pubkey tags",
            created_at: 1_700_000_000,
            kind: Kind::TEXT_NOTE,
            tags: &[
                &[
                    "e",
                    "5c83da77af1dec6d7289834998ad7aafbd9e2191396d75ec3cc27f5a77226f36",
                    "",
                    "root",
                ],
                &["p", AUTHOR_PUBKEY, "wss://relay.example.com"],
            ],
            content: "reply with tags",
            expected_id: "d8d5b8fffca7460c578c065f33dbea7e2e318528308fdb933044074b77c2f380",
            expected_note: None,
        },
        GoldenVector {
            name: "profile metadata at epoch",
            created_at: 0,
            kind: Kind::SET_METADATA,
            tags: &[],
            content: r#"{"name":"toons","about":"","picture":""}"#,
            expected_id: "8f6dc50775dd9399185aa86e4a3dbb27191c8487eae800df76ddc3747328fe3e",
            expected_note: None,
        },
        GoldenVector {
            name: "multi-byte utf-8 content",
            created_at: 1_700_000_000,
            kind: Kind::TEXT_NOTE,
            tags: &[],
            content: "héllo wörld ✓ 日本語",
            expected_id: "2b74f4869db5680087768a52252065759e65ed922d4a8a0bf52ee5372a03534a",
            expected_note: None,
        },
        GoldenVector {
            name: "json escapes in content",
            created_at: 1_700_000_000,
            kind: Kind::TEXT_NOTE,
            tags: &[],
            content: "line\nbreak \"quoted\" back\\slash\ttab",
            expected_id: "48b6f55858b52834db765c3ccdcf1fb4955bbe5a3d602d2fe9c8e8a59b815d60",
            expected_note: None,
        },
    ]
}

/// The vectors' author.
pub fn author() -> Keypair {
    Keypair::from_hex(AUTHOR_SECRET).expect("scalar 1 is a valid secret key")
}

/// Build the unsigned event a vector describes.
pub fn event_from_vector(vector: &GoldenVector) -> Event {
    EventBuilder::new(vector.kind)
        .created_at(vector.created_at)
        .pubkey(author().public_key())
        .tags(vector.tags.iter().map(|fields| Tag::new(fields.iter().copied())))
        .content(vector.content)
        .build()
}

/// Check every vector. Returns `(name, matches, computed id)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|vector| {
            let computed = event_from_vector(vector)
                .compute_id()
                .map(|id| id.to_hex())
                .unwrap_or_default();
            (
                vector.name.to_string(),
                computed == vector.expected_id,
                computed,
            )
        })
        .collect()
}

/// The canonical body a vector hashes, for diagnostics.
pub fn canonical_form(vector: &GoldenVector) -> String {
    canonical_string(&event_from_vector(vector)).unwrap_or_default()
}
