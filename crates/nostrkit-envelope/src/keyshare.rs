//! Per-recipient key shares for multi-recipient messages.
//!
//! The message key is wrapped once per recipient with AES-256-CTR keyed by
//! the sender/recipient shared secret, and carried base64-encoded as the
//! fourth field of that recipient's `p` tag.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::crypto::{EncryptionKey, SharedSecret};

/// A message key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShare([u8; 32]);

impl KeyShare {
    /// Wrap `key` for the party holding the other half of `shared`.
    pub fn create(key: &EncryptionKey, shared: &SharedSecret) -> Self {
        let mut wrapped = [0u8; 32];
        wrapped.copy_from_slice(&shared.apply_keystream(key.as_bytes()));
        Self(wrapped)
    }

    /// Recover the message key.
    pub fn decrypt(&self, shared: &SharedSecret) -> EncryptionKey {
        let mut key = [0u8; 32];
        key.copy_from_slice(&shared.apply_keystream(&self.0));
        EncryptionKey::from_bytes(key)
    }

    /// Tag field form.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Read a tag field. Anything that is not strict base64 of exactly 32
    /// bytes (a petname, say) is not a key share.
    pub fn from_base64(field: &str) -> Option<Self> {
        let bytes = STANDARD.decode(field).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}
