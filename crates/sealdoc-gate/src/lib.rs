//! # Sealdoc Gate
//!
//! Policy-gated encryption: payloads are sealed under a content key, and the
//! content key is released only to callers that satisfy an access policy.
//!
//! ## Overview
//!
//! The [`EncryptionGateway`] trait is the seam between the orchestrator and
//! whatever key-management network enforces policies. [`LocalGateway`] is an
//! in-process reference implementation that evaluates conditions through a
//! [`ConditionEvaluator`].
//!
//! ## Encryption Model
//!
//! 1. **Content Key**: a ChaCha20-Poly1305 key that encrypts the payload
//! 2. **Wrapped Key**: the content key sealed to the network's X25519 key,
//!    bound to one policy digest, owner and chain
//!
//! This allows:
//! - Access rotation without re-encrypting content
//! - Refusing a wrapped key presented with a policy it was not issued for
//! - Refusing rotation by anyone but the address that encrypted the content
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sealdoc_gate::{LocalGateway, LocalGatewayConfig, StaticChain};
//!
//! let chain = Arc::new(StaticChain::new());
//! let gateway = LocalGateway::generate(chain, LocalGatewayConfig::default());
//!
//! // let bundle = gateway.encrypt(b"hello", &policy, "ethereum", kind).await?;
//! // let key = gateway.rewrap_key(&bundle.wrapped_key, &new_policy, "ethereum").await?;
//! ```

pub mod crypto;
pub mod error;
pub mod evaluator;
pub mod gateway;
pub mod local;
pub mod wrap;

pub use crypto::{
    EncryptionKey, EncryptionNonce, EphemeralKeyPair, SharedKey, X25519PublicKey,
    X25519StaticSecret,
};
pub use error::{GatewayError, Result};
pub use evaluator::{ConditionEvaluator, StaticChain};
pub use gateway::EncryptionGateway;
pub use local::{LocalGateway, LocalGatewayConfig};
pub use wrap::{owner_id, WrappedKey, WRAPPED_KEY_LEN, WRAP_VERSION};
