//! Error types for the envelope module.

use thiserror::Error;

/// Errors that can occur while encrypting or decrypting messages.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Content has no `?iv=` separator.
    #[error("missing \"?iv=\" separator")]
    MissingIv,

    /// The IV is not 16 bytes.
    #[error("invalid iv length: expected 16 bytes, got {0}")]
    InvalidIv(usize),

    /// Ciphertext, IV or key share is not strict base64.
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// No tag references the local public key.
    #[error("no tag references the local public key")]
    NoRecipientTag,

    /// Encrypt was called without any recipient.
    #[error("no recipient public key given")]
    NoRecipientGiven,

    /// Wrong key, bad padding, or plaintext that is not UTF-8.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] nostrkit_core::CoreError),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
