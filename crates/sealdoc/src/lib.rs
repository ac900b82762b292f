//! # Sealdoc
//!
//! Encrypted document lifecycle: encrypt a payload under an access policy,
//! store it as a versioned document, decrypt it for callers who satisfy the
//! policy, and rotate the policy without re-encrypting the payload.
//!
//! ## Overview
//!
//! The [`Orchestrator`] is the public workflow surface. It is constructed
//! with two collaborators:
//!
//! - **EncryptionGateway**: seals payloads and releases content keys to
//!   callers whose chain state satisfies the policy
//! - **DocumentStore**: a versioned, signed document store
//!
//! ## Key Concepts
//!
//! - **Bundle**: ciphertext, wrapped key, policy, chain and policy kind
//! - **Rotation**: the content key is rewrapped for a new policy, and the
//!   rewrapped key is written back. The ciphertext never changes, and only
//!   the caller that encrypted the document may rotate it.
//! - **Errors**: callers can tell wrong input, denied access, and corrupt or
//!   conflicting storage apart
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sealdoc::{Orchestrator, OrchestratorConfig, PolicyDescriptor, PolicyKind};
//! use sealdoc::core::{AccessCondition, USER_ADDRESS};
//! use sealdoc::gate::{LocalGateway, LocalGatewayConfig, StaticChain};
//! use sealdoc::store::{MemoryDocumentStore, Session};
//!
//! async fn example() {
//!     let gateway = LocalGateway::generate(
//!         Arc::new(StaticChain::new()),
//!         LocalGatewayConfig::default().with_caller("0xa11ce"),
//!     );
//!     let store = MemoryDocumentStore::new(Session::generate());
//!     let orch = Orchestrator::new(gateway, store, OrchestratorConfig::default()).unwrap();
//!
//!     let policy = PolicyDescriptor::standard(vec![
//!         AccessCondition::new("0xaaa", "balanceOf").param(USER_ADDRESS),
//!     ]);
//!     let handle = orch
//!         .encrypt_and_store(b"hello", &policy, PolicyKind::Standard, None)
//!         .await
//!         .unwrap();
//!
//!     // let plaintext = orch.load_and_decrypt(&handle).await?;
//!     // orch.rotate_access(&handle, &new_policy).await?;
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `sealdoc::core` - Policies, bundles, codec
//! - `sealdoc::store` - Document stores and sessions
//! - `sealdoc::gate` - Encryption gateways and condition evaluation

pub mod config;
pub mod error;
pub mod orchestrator;

// Re-export component crates
pub use sealdoc_core as core;
pub use sealdoc_gate as gate;
pub use sealdoc_store as store;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use orchestrator::Orchestrator;

// Re-export commonly used types
pub use sealdoc_core::{DocumentHandle, PolicyDescriptor, PolicyKind, WireBundle, WorkingBundle};
pub use sealdoc_gate::EncryptionGateway;
pub use sealdoc_store::{DocumentMetadata, DocumentStore};
