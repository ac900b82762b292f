//! Error types for Sealdoc Core.

use thiserror::Error;

/// Errors raised while building or validating core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid policy kind: {0} (expected standard or contract-based)")]
    InvalidPolicyKind(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid document handle: {0}")]
    InvalidHandle(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// A stored bundle could not be read back.
///
/// `field` names the persisted field (`encryptedZip` or `symKey`) so the
/// caller can tell which half of the bundle is damaged, or is
/// [`DecodeError::DOCUMENT`] when the document as a whole does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode field {field}: {reason}")]
pub struct DecodeError {
    pub field: &'static str,
    pub reason: String,
}

impl DecodeError {
    /// Field name used when the stored document is not a bundle at all.
    pub const DOCUMENT: &'static str = "document";

    pub fn new(field: &'static str, reason: impl ToString) -> Self {
        Self {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
