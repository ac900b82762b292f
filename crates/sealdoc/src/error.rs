//! Error types for the Orchestrator.

use sealdoc_core::{CoreError, DecodeError, DocumentHandle};
use sealdoc_gate::GatewayError;
use sealdoc_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Orchestrator operations.
///
/// Variants fall in three groups, see [`OrchestratorError::is_invalid_input`],
/// [`OrchestratorError::is_denied`] and [`OrchestratorError::is_corrupt`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The policy kind is unknown or disagrees with the policy.
    #[error("invalid policy kind: {0}")]
    InvalidPolicyKind(String),

    /// The policy is structurally invalid.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// The orchestrator was configured with unusable settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The store has no established session.
    #[error("document store session is not authenticated")]
    NotAuthenticated,

    /// The gateway could not encrypt.
    #[error("encryption failed: {0}")]
    Encryption(#[source] GatewayError),

    /// The store failed outside of a rotation.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The stored bundle does not decode.
    #[error("bundle {handle} is corrupt: {source}")]
    CorruptBundle {
        handle: DocumentHandle,
        #[source]
        source: DecodeError,
    },

    /// The gateway refused to release the payload.
    #[error("decryption of {handle} denied: {source}")]
    DecryptionDenied {
        handle: DocumentHandle,
        #[source]
        source: GatewayError,
    },

    /// Rewrap or write-back failed; the stored bundle is unchanged.
    #[error("access rotation of {handle} failed: {source}")]
    RotationFailed {
        handle: DocumentHandle,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Another writer moved the document since it was loaded.
    #[error("{handle} was modified concurrently: expected version {expected}, found {actual}")]
    ConcurrentModification {
        handle: DocumentHandle,
        expected: u64,
        actual: u64,
    },

    /// The payload decrypted but is not valid UTF-8.
    #[error("payload of {handle} is not valid UTF-8")]
    InvalidPlaintext {
        handle: DocumentHandle,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl OrchestratorError {
    /// Wrong input from the caller.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            OrchestratorError::InvalidPolicyKind(_)
                | OrchestratorError::InvalidPolicy(_)
                | OrchestratorError::InvalidConfig(_)
        )
    }

    /// The caller may not read the document.
    pub fn is_denied(&self) -> bool {
        matches!(self, OrchestratorError::DecryptionDenied { .. })
    }

    /// Stored data is damaged.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            OrchestratorError::CorruptBundle { .. }
                | OrchestratorError::InvalidPlaintext { .. }
                | OrchestratorError::Store(StoreError::InvalidData(_))
                | OrchestratorError::Store(StoreError::Serialization(_))
        )
    }

    /// A concurrent writer won; reload and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, OrchestratorError::ConcurrentModification { .. })
    }

    /// The document handle the failure concerns, if any.
    pub fn handle(&self) -> Option<&DocumentHandle> {
        match self {
            OrchestratorError::CorruptBundle { handle, .. }
            | OrchestratorError::DecryptionDenied { handle, .. }
            | OrchestratorError::RotationFailed { handle, .. }
            | OrchestratorError::ConcurrentModification { handle, .. }
            | OrchestratorError::InvalidPlaintext { handle, .. } => Some(handle),
            _ => None,
        }
    }
}

impl From<CoreError> for OrchestratorError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPolicyKind(kind) => OrchestratorError::InvalidPolicyKind(kind),
            CoreError::InvalidPolicy(reason) => OrchestratorError::InvalidPolicy(reason),
            other => OrchestratorError::InvalidPolicy(other.to_string()),
        }
    }
}

/// Result type for Orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
