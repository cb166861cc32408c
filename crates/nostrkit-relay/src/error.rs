//! Error types for relay sessions.

use thiserror::Error;

/// Errors that can occur in a relay session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A session is still live on this client.
    #[error("already subscribed")]
    AlreadySubscribed,

    /// Relay URL is malformed or not `ws://` / `wss://`.
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The relay closed the connection.
    #[error("transport closed")]
    TransportClosed,

    /// No response within the configured timeout.
    #[error("timed out waiting for relay")]
    Timeout,

    /// A frame that does not match its declared shape.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// An inbound event failed verification, or the relay refused ours.
    #[error("rejected: {0}")]
    Rejected(String),

    /// An unsigned event was sent without a key to sign it.
    #[error("event is unsigned and no key was given")]
    MissingKey,

    /// The session has already stopped.
    #[error("session closed")]
    SessionClosed,

    /// Sessions spawn tasks and need a tokio runtime.
    #[error("no tokio runtime")]
    NoRuntime,

    /// Event codec error.
    #[error(transparent)]
    Core(#[from] nostrkit_core::CoreError),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, SessionError>;
