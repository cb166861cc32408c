//! Cryptographic primitives for nostrkit.
//!
//! Wraps BIP-340 schnorr signing over secp256k1 and SHA-256 hashing with
//! strong types. Public keys are the 32-byte x-only form used on the wire.

use secp256k1::{schnorr, Message, Parity, SecretKey, XOnlyPublicKey, SECP256K1};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::bech32::{decode_address, encode_address, AddressKind};
use crate::error::{CoreError, Result};

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

hex_newtype!(Sha256Hash, 32, "Sha256");

impl Sha256Hash {
    /// Compute the SHA-256 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// The zero hash (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

/// A 32-byte x-only secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; 32]);

hex_newtype!(PublicKey, 32, "PublicKey");

impl PublicKey {
    /// Encode as an `npub` address.
    pub fn to_bech32(&self) -> String {
        encode_address(AddressKind::PublicKey, &self.0)
    }

    /// Decode an `npub` address.
    pub fn from_bech32(s: &str) -> Result<Self> {
        Ok(Self(decode_address(AddressKind::PublicKey, s)?))
    }

    /// Parse a counterparty key in any of its accepted forms.
    ///
    /// Accepts an `npub` address, a 64-hex x-only key, or a 66-hex compressed
    /// point with the even-y `02` prefix. The result is checked to lie on the curve.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let key = match s.len() {
            64 => Self::from_hex(s)?,
            66 => match s.strip_prefix("02") {
                Some(x) => Self::from_hex(x)?,
                None => return Err(CoreError::InvalidPublicKey),
            },
            _ => Self::from_bech32(s)?,
        };
        key.to_xonly()?;
        Ok(key)
    }

    /// The key as a secp256k1 x-only public key.
    pub fn to_xonly(&self) -> Result<XOnlyPublicKey> {
        XOnlyPublicKey::from_slice(&self.0).map_err(|_| CoreError::InvalidPublicKey)
    }

    /// The full curve point, taking the even-y lift of the x coordinate.
    pub fn to_point(&self) -> Result<secp256k1::PublicKey> {
        Ok(self.to_xonly()?.public_key(Parity::Even))
    }

    /// Verify a schnorr signature over a 32-byte digest.
    pub fn verify(&self, digest: &[u8; 32], signature: &Signature) -> Result<()> {
        let key = self.to_xonly()?;
        let sig = schnorr::Signature::from_slice(&signature.0)
            .map_err(|_| CoreError::InvalidSignature)?;

        SECP256K1
            .verify_schnorr(&sig, &Message::from_digest(*digest), &key)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

/// A 64-byte BIP-340 schnorr signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

hex_newtype!(Signature, 64, "Signature");

/// A secp256k1 keypair for signing events and deriving shared secrets.
#[derive(Clone)]
pub struct Keypair {
    inner: secp256k1::Keypair,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let inner = secp256k1::Keypair::new(SECP256K1, &mut rand::thread_rng());
        Self { inner }
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Self {
            inner: secp256k1::Keypair::from_secret_key(SECP256K1, &secret),
        })
    }

    /// Create from a 64-hex secret key.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| CoreError::InvalidHexString(String::from("<secret key>")))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Create from an `nsec` address.
    pub fn from_bech32(s: &str) -> Result<Self> {
        Self::from_secret_bytes(&decode_address(AddressKind::SecretKey, s)?)
    }

    /// Create from either an `nsec` address or a 64-hex secret key.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with(AddressKind::SecretKey.prefix()) {
            Self::from_bech32(s)
        } else {
            Self::from_hex(s)
        }
    }

    /// Get the x-only public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.inner.x_only_public_key().0.serialize())
    }

    /// Sign a 32-byte digest (deterministic, no auxiliary randomness).
    pub fn sign(&self, digest: &[u8; 32]) -> Signature {
        let sig = SECP256K1.sign_schnorr_no_aux_rand(&Message::from_digest(*digest), &self.inner);
        Signature(sig.serialize())
    }

    /// The secret scalar, for ECDH.
    pub fn secret_key(&self) -> SecretKey {
        self.inner.secret_key()
    }

    /// Get the raw secret bytes (secret key material).
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.inner.secret_bytes()
    }

    /// Encode the secret key as an `nsec` address.
    pub fn to_bech32(&self) -> String {
        encode_address(AddressKind::SecretKey, &self.secret_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

impl PartialEq for Keypair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for Keypair {}
