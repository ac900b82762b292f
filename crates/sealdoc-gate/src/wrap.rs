//! Wrapped content keys.
//!
//! A content key is sealed to the network's X25519 key with an ephemeral
//! key agreement. The wrap key is derived from the shared secret and bound
//! to the policy digest, the owner and the chain, so a key wrapped for one
//! policy cannot be opened under another. The owner is the address that
//! encrypted the content; only the owner may rewrap the key.
//!
//! Byte layout:
//!
//! ```text
//! version(1) || policy_digest(32) || owner(32) || ephemeral_public(32) || nonce(12) || sealed_key(48)
//! ```

use sealdoc_core::Blake3Hash;

use crate::crypto::{
    EncryptionKey, EncryptionNonce, EphemeralKeyPair, X25519PublicKey, X25519StaticSecret,
    NONCE_LEN, TAG_LEN,
};
use crate::error::{GatewayError, Result};

/// Current wrapped key format.
pub const WRAP_VERSION: u8 = 2;

const SEALED_KEY_LEN: usize = 32 + TAG_LEN;

/// Total encoded length of a wrapped key.
pub const WRAPPED_KEY_LEN: usize = 1 + 32 + 32 + 32 + NONCE_LEN + SEALED_KEY_LEN;

const OWNER_DOMAIN: &str = "sealdoc-gate-v1-owner";

/// Identifier of the address that owns a wrapped key.
///
/// Addresses are compared case-insensitively.
pub fn owner_id(address: &str) -> Blake3Hash {
    let mut hasher = blake3::Hasher::new_derive_key(OWNER_DOMAIN);
    hasher.update(address.trim().to_ascii_lowercase().as_bytes());
    Blake3Hash::from_bytes(*hasher.finalize().as_bytes())
}

/// A content key sealed to the network under one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// Digest of the policy this key was wrapped for.
    pub policy_digest: Blake3Hash,

    /// [`owner_id`] of the address allowed to rewrap this key.
    pub owner: Blake3Hash,

    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    pub nonce: EncryptionNonce,

    /// The content key, encrypted with the derived wrap key.
    pub sealed_key: Vec<u8>,
}

impl WrappedKey {
    /// Seal `content_key` to `network` for the policy with `policy_digest`.
    pub fn wrap(
        content_key: &EncryptionKey,
        network: &X25519PublicKey,
        policy_digest: Blake3Hash,
        owner: Blake3Hash,
        chain: &str,
    ) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();
        let shared = ephemeral.diffie_hellman(network);
        let wrap_key = shared.derive_encryption_key(&wrap_context(&policy_digest, &owner, chain));

        let nonce = EncryptionNonce::generate();
        let sealed_key = wrap_key.encrypt(content_key.as_bytes(), &nonce)?;

        Ok(Self {
            policy_digest,
            owner,
            ephemeral_public,
            nonce,
            sealed_key,
        })
    }

    /// Recover the content key with the network secret.
    pub fn unwrap(&self, network: &X25519StaticSecret, chain: &str) -> Result<EncryptionKey> {
        let shared = network.diffie_hellman(&self.ephemeral_public);
        let wrap_key =
            shared.derive_encryption_key(&wrap_context(&self.policy_digest, &self.owner, chain));

        let key_bytes = wrap_key.decrypt(&self.sealed_key, &self.nonce)?;
        if key_bytes.len() != 32 {
            return Err(GatewayError::MalformedKey(format!(
                "invalid key length: expected 32, got {}",
                key_bytes.len()
            )));
        }

        let mut arr = [0u8; 32];
        arr.copy_from_slice(&key_bytes);
        Ok(EncryptionKey::from_bytes(arr))
    }

    pub fn is_owned_by(&self, address: &str) -> bool {
        self.owner == owner_id(address)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(WRAPPED_KEY_LEN);
        out.push(WRAP_VERSION);
        out.extend_from_slice(self.policy_digest.as_bytes());
        out.extend_from_slice(self.owner.as_bytes());
        out.extend_from_slice(self.ephemeral_public.as_bytes());
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&self.sealed_key);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != WRAPPED_KEY_LEN {
            return Err(GatewayError::MalformedKey(format!(
                "expected {WRAPPED_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != WRAP_VERSION {
            return Err(GatewayError::MalformedKey(format!(
                "unknown version {}",
                bytes[0]
            )));
        }

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[1..33]);
        let mut owner = [0u8; 32];
        owner.copy_from_slice(&bytes[33..65]);
        let mut ephemeral = [0u8; 32];
        ephemeral.copy_from_slice(&bytes[65..97]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[97..97 + NONCE_LEN]);

        Ok(Self {
            policy_digest: Blake3Hash::from_bytes(digest),
            owner: Blake3Hash::from_bytes(owner),
            ephemeral_public: X25519PublicKey::from_bytes(ephemeral),
            nonce: EncryptionNonce::from_bytes(nonce),
            sealed_key: bytes[97 + NONCE_LEN..].to_vec(),
        })
    }
}

fn wrap_context(policy_digest: &Blake3Hash, owner: &Blake3Hash, chain: &str) -> Vec<u8> {
    let mut ctx = Vec::with_capacity(64 + chain.len());
    ctx.extend_from_slice(policy_digest.as_bytes());
    ctx.extend_from_slice(owner.as_bytes());
    ctx.extend_from_slice(chain.as_bytes());
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(tag: u8) -> Blake3Hash {
        Blake3Hash::from_bytes([tag; 32])
    }

    fn alice() -> Blake3Hash {
        owner_id("0xa11ce")
    }

    #[test]
    fn test_wrap_unwrap() {
        let network = X25519StaticSecret::generate();
        let content_key = EncryptionKey::generate();

        let wrapped =
            WrappedKey::wrap(&content_key, &network.public_key(), digest(1), alice(), "ethereum")
                .unwrap();
        let recovered = wrapped.unwrap(&network, "ethereum").unwrap();

        assert_eq!(content_key.as_bytes(), recovered.as_bytes());
    }

    #[test]
    fn test_encoded_layout() {
        let network = X25519StaticSecret::generate();
        let wrapped = WrappedKey::wrap(
            &EncryptionKey::generate(),
            &network.public_key(),
            digest(7),
            alice(),
            "ethereum",
        )
        .unwrap();

        let bytes = wrapped.to_bytes();
        assert_eq!(bytes.len(), WRAPPED_KEY_LEN);
        assert_eq!(bytes[0], WRAP_VERSION);
        assert_eq!(&bytes[1..33], &[7u8; 32]);
        assert_eq!(&bytes[33..65], alice().as_bytes());
        assert_eq!(WrappedKey::from_bytes(&bytes).unwrap(), wrapped);
    }

    #[test]
    fn test_wrong_network_fails() {
        let network = X25519StaticSecret::generate();
        let wrapped = WrappedKey::wrap(
            &EncryptionKey::generate(),
            &network.public_key(),
            digest(1),
            alice(),
            "ethereum",
        )
        .unwrap();

        let other = X25519StaticSecret::generate();
        assert!(matches!(
            wrapped.unwrap(&other, "ethereum"),
            Err(GatewayError::Tampered(_))
        ));
    }

    #[test]
    fn test_rebinding_digest_fails() {
        let network = X25519StaticSecret::generate();
        let mut wrapped = WrappedKey::wrap(
            &EncryptionKey::generate(),
            &network.public_key(),
            digest(1),
            alice(),
            "ethereum",
        )
        .unwrap();

        wrapped.policy_digest = digest(2);
        assert!(wrapped.unwrap(&network, "ethereum").is_err());
    }

    #[test]
    fn test_rebinding_owner_fails() {
        let network = X25519StaticSecret::generate();
        let mut wrapped = WrappedKey::wrap(
            &EncryptionKey::generate(),
            &network.public_key(),
            digest(1),
            alice(),
            "ethereum",
        )
        .unwrap();
        assert!(wrapped.is_owned_by("0xa11ce"));
        assert!(!wrapped.is_owned_by("0xb0b"));

        // Claiming the key for another address breaks the seal
        wrapped.owner = owner_id("0xb0b");
        assert!(matches!(
            wrapped.unwrap(&network, "ethereum"),
            Err(GatewayError::Tampered(_))
        ));
    }

    #[test]
    fn test_owner_id_ignores_case() {
        assert_eq!(owner_id("0xABC"), owner_id("0xabc"));
        assert_ne!(owner_id("0xabc"), owner_id("0xabd"));
    }

    #[test]
    fn test_other_chain_fails() {
        let network = X25519StaticSecret::generate();
        let wrapped = WrappedKey::wrap(
            &EncryptionKey::generate(),
            &network.public_key(),
            digest(1),
            alice(),
            "ethereum",
        )
        .unwrap();

        assert!(wrapped.unwrap(&network, "polygon").is_err());
    }

    #[test]
    fn test_from_bytes_rejects_bad_input() {
        assert!(matches!(
            WrappedKey::from_bytes(&[1u8; 10]),
            Err(GatewayError::MalformedKey(_))
        ));

        let mut bytes = vec![0u8; WRAPPED_KEY_LEN];
        bytes[0] = 9;
        assert!(matches!(
            WrappedKey::from_bytes(&bytes),
            Err(GatewayError::MalformedKey(_))
        ));
    }
}
