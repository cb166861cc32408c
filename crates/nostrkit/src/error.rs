//! Error types for the client API.

use nostrkit_core::CoreError;
use nostrkit_envelope::EnvelopeError;
use nostrkit_relay::SessionError;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum NostrError {
    /// Event codec, key or proof-of-work error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Encryption or decryption error.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Relay session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// `publish` was called with no live subscription.
    #[error("not subscribed")]
    NotSubscribed,
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, NostrError>;
