//! # nostrkit testkit
//!
//! Testing utilities for nostrkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known events with expected ids for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic keys, signed batches, relay frames and an in-memory relay
//!
//! ## Golden Vectors
//!
//! ```rust
//! use nostrkit_testkit::vectors::{all_vectors, event_from_vector};
//!
//! for vector in all_vectors() {
//!     let id = event_from_vector(&vector).compute_id().unwrap();
//!     assert_eq!(id.to_hex(), vector.expected_id);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use nostrkit_testkit::generators::{event_from_params, EventParams};
//!
//! proptest! {
//!     #[test]
//!     fn id_is_deterministic(params: EventParams) {
//!         let a = event_from_params(&params).compute_id().unwrap();
//!         let b = event_from_params(&params).compute_id().unwrap();
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use nostrkit_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::with_scalar(1);
//! let batch = fixture.signed_batch(5);
//! assert_eq!(batch.len(), 5);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{keypair, multi_party_fixtures, TestFixture};
pub use generators::{event_from_params, signed_event_from_params, EventParams};
pub use vectors::{all_vectors, event_from_vector, verify_all_vectors, GoldenVector};
