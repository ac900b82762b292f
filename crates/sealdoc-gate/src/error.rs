//! Error types for the gateway module.

use sealdoc_core::{CoreError, PolicyKind};
use thiserror::Error;

/// Errors that can occur during gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway does not evaluate policies on this chain.
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    /// The declared policy kind disagrees with the policy's own tag.
    #[error("policy kind mismatch: declared {declared}, policy is {actual}")]
    PolicyKindMismatch {
        declared: PolicyKind,
        actual: PolicyKind,
    },

    /// The wrapped key was not issued for this policy.
    #[error("wrapped key is bound to a different policy")]
    PolicyMismatch,

    /// Only the address that encrypted the content may change its policy.
    #[error("caller {0} does not own the wrapped key")]
    NotOwner(String),

    /// The caller does not satisfy the policy.
    #[error("access conditions not met: {0}")]
    ConditionsNotMet(String),

    /// Authenticated decryption failed.
    #[error("ciphertext or key failed authentication: {0}")]
    Tampered(String),

    /// Wrapped key bytes do not parse.
    #[error("malformed wrapped key: {0}")]
    MalformedKey(String),

    /// Ciphertext bytes do not parse.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// The condition evaluator could not answer.
    #[error("condition evaluation failed: {0}")]
    Evaluator(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl GatewayError {
    /// Whether the failure means "this caller may not read this bundle"
    /// rather than "the gateway could not do its job".
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            GatewayError::PolicyMismatch
                | GatewayError::ConditionsNotMet(_)
                | GatewayError::NotOwner(_)
                | GatewayError::Tampered(_)
                | GatewayError::PolicyKindMismatch { .. }
        )
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
