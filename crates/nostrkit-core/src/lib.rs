//! # nostrkit core
//!
//! Pure primitives for nostrkit: events, keys, bech32 addresses, filters and
//! proof of work.
//!
//! This crate contains no I/O and no networking. It is pure computation over
//! signed protocol messages.
//!
//! ## Key Types
//!
//! - [`Event`] - The signed, timestamped, typed protocol message
//! - [`EventId`] - SHA-256 of the event's canonical body
//! - [`Keypair`] / [`PublicKey`] - BIP-340 schnorr keys over secp256k1
//! - [`Tags`] - Ordered tag list with reference helpers
//! - [`Filter`] - Subscription query
//!
//! ## Canonicalization
//!
//! Ids and signatures are computed over a compact JSON array. See [`canonical`].

#[macro_use]
mod macros;

pub mod bech32;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod filter;
pub mod metadata;
pub mod pow;
pub mod tags;
pub mod types;

pub use bech32::{AddressKind, DecodeError};
pub use canonical::{canonical_bytes, canonical_string};
pub use crypto::{Keypair, PublicKey, Sha256Hash, Signature};
pub use error::{CoreError, Result};
pub use event::{Event, EventBuilder};
pub use filter::Filter;
pub use metadata::Metadata;
pub use pow::{mine, mine_until};
pub use tags::{Marker, Tag, Tags};
pub use types::{EventId, Kind};
