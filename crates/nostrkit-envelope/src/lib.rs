//! # nostrkit envelope
//!
//! Encrypted direct messages.
//!
//! ## Scheme
//!
//! - Shared secret: x coordinate of the secp256k1 ECDH point, unhashed
//! - Content: AES-256-CBC with PKCS#7 padding and a fresh 16-byte IV
//! - Wire form: `base64(ciphertext)?iv=base64(iv)`
//!
//! Messages to several recipients encrypt once under `sha256(content)` and
//! hand each recipient that key wrapped with AES-256-CTR under their shared
//! secret, in the fourth field of their `p` tag.
//!
//! ## Usage
//!
//! ```ignore
//! use nostrkit_envelope::{decrypt, encrypted_message};
//!
//! let event = encrypted_message("hi", &bob.public_key(), &alice)?;
//! assert_eq!(decrypt(&event, &bob)?, "hi");
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keyshare;
pub mod message;

pub use crypto::{EncryptionKey, Iv, SharedSecret};
pub use envelope::EncryptedContent;
pub use error::{EnvelopeError, Result};
pub use keyshare::KeyShare;
pub use message::{decrypt, encrypt, encrypted_message};
