//! Strong type definitions for nostrkit.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bech32::{decode_address, encode_address, AddressKind};
use crate::error::Result;

/// A 32-byte event identifier, computed as SHA-256(canonical_bytes(event)).
///
/// Two events with the same content, author, kind, tags and timestamp have
/// the same EventId.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub [u8; 32]);

hex_newtype!(EventId, 32, "EventId");

impl EventId {
    /// Encode as a `note` address.
    pub fn to_bech32(&self) -> String {
        encode_address(AddressKind::EventId, &self.0)
    }

    /// Decode a `note` address.
    pub fn from_bech32(s: &str) -> Result<Self> {
        Ok(Self(decode_address(AddressKind::EventId, s)?))
    }

    /// The zero event ID (used as a sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

/// The kind of an event, determining how its content is interpreted.
///
/// Kinds are open-ended integers; the named constants cover the ones this
/// crate builds itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(pub u16);

impl Kind {
    /// Profile metadata (name, about, picture).
    pub const SET_METADATA: Self = Self(0);
    /// Short plain-text note.
    pub const TEXT_NOTE: Self = Self(1);
    /// Relay URL the author recommends to followers.
    pub const RECOMMEND_RELAY: Self = Self(2);
    /// Encrypted direct message.
    pub const ENCRYPTED_MESSAGE: Self = Self(4);

    /// Convert to u16 for serialization.
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for Kind {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SET_METADATA => f.write_str("Kind(SetMetadata)"),
            Self::TEXT_NOTE => f.write_str("Kind(TextNote)"),
            Self::RECOMMEND_RELAY => f.write_str("Kind(RecommendRelay)"),
            Self::ENCRYPTED_MESSAGE => f.write_str("Kind(EncryptedMessage)"),
            Self(other) => write!(f, "Kind({other})"),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
