//! Canonical JSON encoding of an event body.
//!
//! The canonical form is the compact JSON array
//!
//! ```text
//! [0,<pubkey hex>,<created_at>,<kind>,<tags>,<content>]
//! ```
//!
//! with no insignificant whitespace and non-ASCII characters written as
//! literal UTF-8. Field order is fixed by position. Every event id and
//! signature is computed over exactly these bytes.

use crate::crypto::PublicKey;
use crate::error::{CoreError, Result};
use crate::event::Event;
use crate::tags::Tags;
use crate::types::Kind;

/// Positional body tuple; serializes to the canonical array.
type Body<'a> = (u8, &'a PublicKey, u64, Kind, &'a Tags, &'a str);

/// Encode the signed body of an event.
///
/// Fails with [`CoreError::IncompleteEvent`] if pubkey, created_at, kind or
/// content is unset, and with [`CoreError::EmptyTag`] on an empty tag.
pub fn canonical_bytes(event: &Event) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&body(event)?)?)
}

/// [`canonical_bytes`] as a string, for display and test vectors.
pub fn canonical_string(event: &Event) -> Result<String> {
    Ok(serde_json::to_string(&body(event)?)?)
}

fn body(event: &Event) -> Result<Body<'_>> {
    let (pubkey, created_at, kind, content) = required_fields(event)?;

    if let Some(index) = event.tags.iter().position(|tag| tag.is_empty()) {
        return Err(CoreError::EmptyTag(index));
    }

    Ok((0, pubkey, created_at, kind, &event.tags, content))
}

fn required_fields(event: &Event) -> Result<(&PublicKey, u64, Kind, &str)> {
    match (&event.pubkey, event.created_at, event.kind, &event.content) {
        (Some(pubkey), Some(created_at), Some(kind), Some(content)) => {
            Ok((pubkey, created_at, kind, content.as_str()))
        }
        _ => {
            let missing: Vec<&str> = [
                ("pubkey", event.pubkey.is_none()),
                ("created_at", event.created_at.is_none()),
                ("kind", event.kind.is_none()),
                ("content", event.content.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            Err(CoreError::IncompleteEvent(missing.join(", ")))
        }
    }
}
