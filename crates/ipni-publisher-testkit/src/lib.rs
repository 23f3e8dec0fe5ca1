//! # IPNI Publisher Testkit
//!
//! Testing utilities for the IPNI publisher.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed inputs with independently computed CIDs,
//!   signatures and announce bytes
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic identities and a pre-seeded memory store
//!
//! ## Golden Vectors
//!
//! ```rust
//! use ipni_publisher_testkit::vectors::verify_all_vectors;
//!
//! let mismatches = verify_all_vectors();
//! assert!(mismatches.is_empty(), "{:?}", mismatches);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ipni_publisher_testkit::generators::batch_reference;
//!
//! proptest! {
//!     #[test]
//!     fn ads_verify(reference in batch_reference()) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use ipni_publisher_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let providers = fixture.transport_providers();
//! assert_eq!(providers.len(), 2);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{content_cid, TestFixture, BITSWAP_ADDR, HTTP_ADDR};
pub use vectors::{build_chain_vector, peer_id_vectors, verify_all_vectors, ChainVector};
