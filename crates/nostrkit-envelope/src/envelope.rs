//! Encrypted content envelope.
//!
//! Encrypted message content travels as one string:
//! `base64(ciphertext) + "?iv=" + base64(iv)`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::str::FromStr;

use crate::crypto::{EncryptionKey, Iv};
use crate::error::{EnvelopeError, Result};

const IV_SEPARATOR: &str = "?iv=";

/// AES-256-CBC ciphertext together with its IV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContent {
    /// The padded ciphertext.
    pub ciphertext: Vec<u8>,

    /// IV used for encryption (fresh per message).
    pub iv: Iv,
}

impl EncryptedContent {
    /// Encrypt plaintext with the given key under a fresh random IV.
    pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Self {
        let iv = Iv::generate();
        Self {
            ciphertext: key.encrypt(plaintext, &iv),
            iv,
        }
    }

    /// Decrypt with the given key.
    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Vec<u8>> {
        key.decrypt(&self.ciphertext, &self.iv)
    }

    /// Decrypt with the given key, requiring UTF-8 plaintext.
    pub fn decrypt_to_string(&self, key: &EncryptionKey) -> Result<String> {
        String::from_utf8(self.decrypt(key)?).map_err(|e| EnvelopeError::Decryption(e.to_string()))
    }

    /// Wire form carried in event content.
    pub fn to_wire(&self) -> String {
        format!(
            "{}{}{}",
            STANDARD.encode(&self.ciphertext),
            IV_SEPARATOR,
            STANDARD.encode(self.iv.as_bytes())
        )
    }

    /// Parse the wire form with strict base64 on both halves.
    pub fn parse(s: &str) -> Result<Self> {
        let (ciphertext, iv) = s.split_once(IV_SEPARATOR).ok_or(EnvelopeError::MissingIv)?;

        let ciphertext = STANDARD.decode(ciphertext)?;
        let iv = STANDARD.decode(iv)?;
        let iv: [u8; 16] = iv
            .as_slice()
            .try_into()
            .map_err(|_| EnvelopeError::InvalidIv(iv.len()))?;

        Ok(Self {
            ciphertext,
            iv: Iv::from_bytes(iv),
        })
    }
}

impl fmt::Display for EncryptedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for EncryptedContent {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
