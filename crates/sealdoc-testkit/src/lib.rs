//! # Sealdoc Testkit
//!
//! Testing utilities for Sealdoc.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Pinned encodings of raw bytes and stored bundles
//! - **Generators**: Proptest strategies for policies and bundles
//! - **Fixtures**: A simulated chain, gateway network and store shared by many callers
//!
//! ## Golden Vectors
//!
//! ```rust
//! use sealdoc_testkit::vectors::verify_codec_vectors;
//!
//! for (name, passed, detail) in verify_codec_vectors() {
//!     assert!(passed, "{name}: {detail}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sealdoc_core::{to_wire, to_working};
//! use sealdoc_testkit::generators::working_bundle;
//!
//! proptest! {
//!     #[test]
//!     fn bundle_roundtrip(bundle in working_bundle()) {
//!         prop_assert_eq!(to_working(&to_wire(&bundle)).unwrap(), bundle);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use sealdoc_testkit::fixtures::{callers, holder_policy, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let alice = &callers(1)[0];
//! fixture.grant("0xaaa", alice);
//! let orch = fixture.orchestrator_for(alice);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{callers, contracts, holder_policy, member_policy, TestFixture};
