//! Encrypted bundles and the mapping between their two forms.
//!
//! A [`WorkingBundle`] holds raw bytes and is what the encryption gateway
//! produces and consumes. A [`WireBundle`] holds the same record with the
//! binary fields base64-encoded, and is what the document store persists.
//!
//! ```text
//! WireBundle = encode(ciphertext, wrapped_key) + (policy, chain, policy_kind)
//! to_working(to_wire(b)) == b
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::DecodeError;
use crate::policy::{PolicyDescriptor, PolicyKind};

/// Persisted name of the ciphertext field.
pub const CIPHERTEXT_FIELD: &str = "encryptedZip";
/// Persisted name of the wrapped key field.
pub const WRAPPED_KEY_FIELD: &str = "symKey";

/// In-memory bundle: raw ciphertext and wrapped key.
///
/// Never mutated once built. Rotation builds a replacement with
/// [`WorkingBundle::with_rotated_access`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingBundle {
    /// The encrypted payload.
    pub ciphertext: Bytes,
    /// The content key, wrapped under `policy`.
    pub wrapped_key: Bytes,
    pub policy: PolicyDescriptor,
    /// Verification network that evaluates `policy`.
    pub chain: String,
    pub policy_kind: PolicyKind,
}

impl WorkingBundle {
    pub fn new(
        ciphertext: impl Into<Bytes>,
        wrapped_key: impl Into<Bytes>,
        policy: PolicyDescriptor,
        chain: impl Into<String>,
        policy_kind: PolicyKind,
    ) -> Self {
        Self {
            ciphertext: ciphertext.into(),
            wrapped_key: wrapped_key.into(),
            policy,
            chain: chain.into(),
            policy_kind,
        }
    }

    /// Build the bundle that replaces this one after an access rotation.
    ///
    /// The ciphertext buffer is shared, chain and kind are carried over.
    /// `wrapped_key` must be the key rewrapped under `policy`.
    pub fn with_rotated_access(&self, wrapped_key: impl Into<Bytes>, policy: PolicyDescriptor) -> Self {
        Self {
            ciphertext: self.ciphertext.clone(),
            wrapped_key: wrapped_key.into(),
            policy,
            chain: self.chain.clone(),
            policy_kind: self.policy_kind,
        }
    }
}

/// Persisted bundle: binary fields as base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBundle {
    #[serde(rename = "encryptedZip")]
    pub ciphertext: String,
    #[serde(rename = "symKey")]
    pub wrapped_key: String,
    #[serde(rename = "accessControlConditions")]
    pub policy: PolicyDescriptor,
    pub chain: String,
    #[serde(rename = "accessControlConditionType")]
    pub policy_kind: PolicyKind,
}

/// Encode a working bundle for storage.
pub fn to_wire(bundle: &WorkingBundle) -> WireBundle {
    WireBundle {
        ciphertext: codec::encode(&bundle.ciphertext),
        wrapped_key: codec::encode(&bundle.wrapped_key),
        policy: bundle.policy.clone(),
        chain: bundle.chain.clone(),
        policy_kind: bundle.policy_kind,
    }
}

/// Decode a stored bundle.
///
/// Only the encoding is checked. Whether the key and ciphertext belong to a
/// real encryption session is for the gateway to find out.
pub fn to_working(wire: &WireBundle) -> Result<WorkingBundle, DecodeError> {
    let ciphertext = codec::decode_field(CIPHERTEXT_FIELD, &wire.ciphertext)?;
    let wrapped_key = codec::decode_field(WRAPPED_KEY_FIELD, &wire.wrapped_key)?;

    Ok(WorkingBundle {
        ciphertext: Bytes::from(ciphertext),
        wrapped_key: Bytes::from(wrapped_key),
        policy: wire.policy.clone(),
        chain: wire.chain.clone(),
        policy_kind: wire.policy_kind,
    })
}

impl From<&WorkingBundle> for WireBundle {
    fn from(bundle: &WorkingBundle) -> Self {
        to_wire(bundle)
    }
}

impl TryFrom<&WireBundle> for WorkingBundle {
    type Error = DecodeError;

    fn try_from(wire: &WireBundle) -> Result<Self, Self::Error> {
        to_working(wire)
    }
}
