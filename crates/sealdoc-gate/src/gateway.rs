//! The encryption gateway abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sealdoc_core::{PolicyDescriptor, PolicyKind, WorkingBundle};

use crate::error::Result;

/// A service that encrypts under a policy and releases keys to callers
/// who satisfy it.
///
/// Implementations hold their own caller credentials.
#[async_trait]
pub trait EncryptionGateway: Send + Sync {
    /// Encrypt `plaintext` under a fresh content key wrapped for `policy`.
    async fn encrypt(
        &self,
        plaintext: &[u8],
        policy: &PolicyDescriptor,
        chain: &str,
        kind: PolicyKind,
    ) -> Result<WorkingBundle>;

    /// Recover the plaintext if the caller satisfies `policy`.
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        wrapped_key: &[u8],
        policy: &PolicyDescriptor,
        chain: &str,
        kind: PolicyKind,
    ) -> Result<Vec<u8>>;

    /// Rewrap the content key inside `wrapped_key` for `new_policy`.
    ///
    /// The ciphertext stays valid: the content key does not change.
    async fn rewrap_key(
        &self,
        wrapped_key: &[u8],
        new_policy: &PolicyDescriptor,
        chain: &str,
    ) -> Result<Bytes>;
}

#[async_trait]
impl<G: EncryptionGateway + ?Sized> EncryptionGateway for Arc<G> {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        policy: &PolicyDescriptor,
        chain: &str,
        kind: PolicyKind,
    ) -> Result<WorkingBundle> {
        (**self).encrypt(plaintext, policy, chain, kind).await
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        wrapped_key: &[u8],
        policy: &PolicyDescriptor,
        chain: &str,
        kind: PolicyKind,
    ) -> Result<Vec<u8>> {
        (**self)
            .decrypt(ciphertext, wrapped_key, policy, chain, kind)
            .await
    }

    async fn rewrap_key(
        &self,
        wrapped_key: &[u8],
        new_policy: &PolicyDescriptor,
        chain: &str,
    ) -> Result<Bytes> {
        (**self).rewrap_key(wrapped_key, new_policy, chain).await
    }
}
