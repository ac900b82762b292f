//! # Sealdoc Core
//!
//! Pure data model for Sealdoc: access policies, encrypted bundles, and the
//! codec that moves a bundle between its in-memory and persisted forms.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`PolicyDescriptor`] - Who may decrypt, as a tagged set of conditions
//! - [`PolicyKind`] - Which condition dialect a policy is written in
//! - [`WorkingBundle`] - Raw ciphertext + wrapped key, ready for the gateway
//! - [`WireBundle`] - Text-safe form of the same bundle, ready for the store
//! - [`DocumentHandle`] - Opaque identifier of a stored bundle
//!
//! ## Encoding
//!
//! Binary fields are carried as padded standard base64 on the wire. See the
//! [`codec`] and [`bundle`] modules. Policies hash through deterministic CBOR,
//! see [`canonical`].

pub mod bundle;
pub mod canonical;
pub mod codec;
pub mod error;
pub mod policy;
pub mod types;

pub use bundle::{to_wire, to_working, WireBundle, WorkingBundle};
pub use canonical::{canonical_policy_bytes, policy_digest};
pub use error::{CoreError, DecodeError, Result};
pub use policy::{
    AbiParam, AccessCondition, ChainCall, Comparator, ContractCondition, ContractPolicy,
    FunctionAbi, PolicyDescriptor, PolicyKind, ReturnValueTest, StandardPolicy, USER_ADDRESS,
};
pub use types::{Blake3Hash, DocumentHandle};
