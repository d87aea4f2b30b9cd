//! # certmint testkit
//!
//! Testing utilities for certmint.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Canonical payloads, signatures and fingerprints with
//!   pinned expected values
//! - **Generators**: Proptest strategies for content, field values and keys
//! - **Fixtures**: Sample content, templates and ready-made services
//!
//! ## Golden Vectors
//!
//! ```rust
//! use certmint_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use certmint_testkit::generators::{content, keypair};
//!
//! proptest! {
//!     #[test]
//!     fn tokens_roundtrip(content in content(), keypair in keypair()) {
//!         let token = certmint_core::token::sign(&content, &keypair).unwrap();
//!         let back = certmint_core::token::verify(token.as_str(), &keypair.public_key());
//!         prop_assert_eq!(back.unwrap(), content);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use certmint_testkit::fixtures::{sample_content, TestFixture};
//!
//! let fixture = TestFixture::with_seed([7; 32]);
//! let token = fixture.sign(&sample_content());
//! assert!(!token.as_str().is_empty());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{sample_content, TestFixture};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
