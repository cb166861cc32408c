//! Error types for nostrkit core.

use thiserror::Error;

use crate::bech32::DecodeError;
use crate::types::Kind;

/// Errors that can occur while building, serializing, signing or mining events.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid hex string: {0}")]
    InvalidHexString(String),

    #[error("tag {0} is empty")]
    EmptyTag(usize),

    #[error("invalid marker {0:?}: expected \"root\" or \"reply\"")]
    InvalidMarker(String),

    #[error("incomplete event: missing {0}")]
    IncompleteEvent(String),

    #[error("event id mismatch: expected {expected}, got {actual}")]
    IntegrityError { expected: String, actual: String },

    #[error("unexpected kind: expected {expected}, found {found:?}")]
    UnexpectedKind { expected: Kind, found: Option<Kind> },

    #[error("event has no pubkey")]
    OrphanEvent,

    #[error("mining cancelled")]
    MiningCancelled,

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid nip05 identifier: {0}")]
    Nip05Format(String),

    #[error("bech32: {0}")]
    Bech32(#[from] DecodeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
