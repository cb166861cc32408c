//! Cryptographic utilities for the envelope module.
//!
//! Provides secp256k1 ECDH, AES-256-CBC content encryption and AES-256-CTR
//! key wrapping.

use aes::cipher::{
    block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher,
};
use aes::Aes256;
use rand::RngCore;

use nostrkit_core::{Keypair, PublicKey};

use crate::error::{EnvelopeError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Initial CTR block: a 128-bit big-endian counter starting at 1.
const COUNTER_START: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];

/// The x coordinate of `secret × peer`, used directly as a symmetric key.
///
/// Both parties derive the same bytes: `a × B` and `b × A` are the same point.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Derive the secret shared between `keys` and `peer`.
    pub fn derive(keys: &Keypair, peer: &PublicKey) -> Result<Self> {
        let point = peer.to_point()?;
        let product = secp256k1::ecdh::shared_secret_point(&point, &keys.secret_key());

        let mut x = [0u8; 32];
        x.copy_from_slice(&product[..32]);
        Ok(Self(x))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Use the secret itself as the content key (two-party messages).
    pub fn to_encryption_key(&self) -> EncryptionKey {
        EncryptionKey(self.0)
    }

    /// Encrypt or decrypt `data` with AES-256-CTR keyed by this secret.
    pub fn apply_keystream(&self, data: &[u8]) -> Vec<u8> {
        let mut buf = data.to_vec();
        let mut cipher = Aes256Ctr::new(&self.0.into(), &COUNTER_START.into());
        cipher.apply_keystream(&mut buf);
        buf
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// A 256-bit AES key for message content.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// AES-256-CBC with PKCS#7 padding.
    pub fn encrypt(&self, plaintext: &[u8], iv: &Iv) -> Vec<u8> {
        Aes256CbcEnc::new(&self.0.into(), &iv.0.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Inverse of [`EncryptionKey::encrypt`]. Fails on bad padding.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &Iv) -> Result<Vec<u8>> {
        Aes256CbcDec::new(&self.0.into(), &iv.0.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| EnvelopeError::Decryption(e.to_string()))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// A 128-bit CBC initialization vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv(pub [u8; 16]);

impl Iv {
    /// Generate a new random IV.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn keypair(scalar: u8) -> Keypair {
        let mut secret = [0u8; 32];
        secret[31] = scalar;
        Keypair::from_secret_bytes(&secret).unwrap()
    }

    #[test]
    fn test_shared_secret_agreement() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();

        let alice_shared = SharedSecret::derive(&alice, &bob.public_key()).unwrap();
        let bob_shared = SharedSecret::derive(&bob, &alice.public_key()).unwrap();

        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn test_shared_secret_is_unhashed_x_coordinate() {
        // 1 × 2G = 2G; its x coordinate is the well-known value below.
        let shared = SharedSecret::derive(&keypair(1), &keypair(2).public_key()).unwrap();
        assert_eq!(
            hex::encode(shared.as_bytes()),
            "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5"
        );
    }

    #[test]
    fn test_cbc_known_answer() {
        let shared = SharedSecret::derive(&keypair(2), &keypair(1).public_key()).unwrap();
        let key = shared.to_encryption_key();
        let iv = Iv::from_bytes(core::array::from_fn(|i| i as u8));

        let ciphertext = key.encrypt("hello nip04 ✓".as_bytes(), &iv);
        assert_eq!(hex::encode(&ciphertext), "ce37130fd136f81b7cc74fda9f3b002a");
        assert_eq!(key.decrypt(&ciphertext, &iv).unwrap(), "hello nip04 ✓".as_bytes());
    }

    #[test]
    fn test_ctr_known_answer() {
        let shared = SharedSecret::derive(&keypair(1), &keypair(2).public_key()).unwrap();
        let secret =
            hex::decode("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
                .unwrap();

        let wrapped = shared.apply_keystream(&secret);
        assert_eq!(
            hex::encode(&wrapped),
            "98a865cb08dc5f596ba76c88e850d68ffef583274969579f789dc918a56b1213"
        );
        assert_eq!(shared.apply_keystream(&wrapped), secret);
    }

    #[test]
    fn test_decrypt_wrong_key_fails_or_garbles() {
        let key1 = EncryptionKey::from_bytes([1; 32]);
        let key2 = EncryptionKey::from_bytes([2; 32]);
        let iv = Iv::generate();

        let ciphertext = key1.encrypt(b"hello, world!", &iv);
        match key2.decrypt(&ciphertext, &iv) {
            Ok(plaintext) => assert_ne!(plaintext, b"hello, world!"),
            Err(e) => assert!(matches!(e, EnvelopeError::Decryption(_))),
        }
    }
}
