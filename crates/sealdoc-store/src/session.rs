//! Store sessions and signed commits.
//!
//! A session is the signing identity a store client writes with. Its
//! controller id is `did:key:<hex ed25519 public key>`. Every version of a
//! document is a [`Commit`] signed by the session that wrote it, and the
//! store checks the head commit's signature on every load.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sealdoc_core::{Blake3Hash, DocumentHandle};

use crate::error::{Result, StoreError};

/// Prefix of controller ids.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CommitSignature(pub [u8; 64]);

impl CommitSignature {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CommitSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitSig({}...)", &self.to_hex()[..16])
    }
}

impl TryFrom<&[u8]> for CommitSignature {
    type Error = StoreError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| StoreError::InvalidData(format!("signature is {} bytes", bytes.len())))?;
        Ok(Self(arr))
    }
}

/// One signed version of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Version number, starting at 0 for the genesis commit.
    pub version: u64,
    /// Blake3 of the serialized content.
    pub content_digest: Blake3Hash,
    /// Controller id of the writer.
    pub author: String,
    pub signature: CommitSignature,
    /// Writer's clock, Unix milliseconds.
    pub timestamp: i64,
}

/// An authenticated store client identity.
#[derive(Clone)]
pub struct Session {
    signing_key: SigningKey,
    controller: String,
}

impl Session {
    /// Start a session with a fresh random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self::from_signing_key(SigningKey::generate(&mut rng))
    }

    /// Start a session from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let controller = format!(
            "{}{}",
            DID_KEY_PREFIX,
            hex::encode(signing_key.verifying_key().to_bytes())
        );
        Self {
            signing_key,
            controller,
        }
    }

    /// The controller id documents written by this session name.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Sign a new version of `handle`.
    pub fn sign_commit(&self, handle: &DocumentHandle, version: u64, content: &[u8]) -> Commit {
        let content_digest = Blake3Hash::hash(content);
        let message = commit_message(handle, version, &content_digest);
        let signature = self.signing_key.sign(&message);

        Commit {
            version,
            content_digest,
            author: self.controller.clone(),
            signature: CommitSignature(signature.to_bytes()),
            timestamp: now_millis(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.controller)
    }
}

/// Parse the verifying key out of a controller id.
pub fn controller_key(controller: &str) -> Option<VerifyingKey> {
    let hex_key = controller.strip_prefix(DID_KEY_PREFIX)?;
    let bytes: [u8; 32] = hex::decode(hex_key).ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

/// Check that `commit` signs `content` as version `commit.version` of `handle`.
pub fn verify_commit(commit: &Commit, handle: &DocumentHandle, content: &[u8]) -> Result<()> {
    let digest = Blake3Hash::hash(content);
    if digest != commit.content_digest {
        return Err(StoreError::InvalidData(format!(
            "content of {handle} v{} does not match its commit",
            commit.version
        )));
    }

    let key = controller_key(&commit.author).ok_or_else(|| {
        StoreError::InvalidData(format!("commit author {} is not a did:key", commit.author))
    })?;

    let message = commit_message(handle, commit.version, &digest);
    key.verify(&message, &Signature::from_bytes(&commit.signature.0))
        .map_err(|_| {
            StoreError::InvalidData(format!(
                "bad signature on {handle} v{}",
                commit.version
            ))
        })
}

fn commit_message(handle: &DocumentHandle, version: u64, digest: &Blake3Hash) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("sealdoc-commit-v1");
    hasher.update(handle.as_str().as_bytes());
    hasher.update(&version.to_be_bytes());
    hasher.update(digest.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> DocumentHandle {
        DocumentHandle::parse("sd1test").unwrap()
    }

    #[test]
    fn test_controller_roundtrip() {
        let session = Session::from_seed(&[0x42; 32]);
        assert!(session.controller().starts_with(DID_KEY_PREFIX));

        let key = controller_key(session.controller()).unwrap();
        assert_eq!(key, session.signing_key.verifying_key());
    }

    #[test]
    fn test_controller_key_rejects_garbage() {
        assert!(controller_key("did:pkh:eip155:1:0xabc").is_none());
        assert!(controller_key("did:key:nothex").is_none());
        assert!(controller_key("did:key:abcd").is_none());
    }

    #[test]
    fn test_commit_verifies() {
        let session = Session::generate();
        let commit = session.sign_commit(&handle(), 3, b"{\"a\":1}");

        assert_eq!(commit.version, 3);
        assert_eq!(commit.author, session.controller());
        verify_commit(&commit, &handle(), b"{\"a\":1}").unwrap();
    }

    #[test]
    fn test_commit_rejects_other_content() {
        let session = Session::generate();
        let commit = session.sign_commit(&handle(), 0, b"original");

        assert!(verify_commit(&commit, &handle(), b"tampered").is_err());
    }

    #[test]
    fn test_commit_rejects_replay_on_other_version() {
        let session = Session::generate();
        let mut commit = session.sign_commit(&handle(), 0, b"content");
        commit.version = 1;

        assert!(verify_commit(&commit, &handle(), b"content").is_err());
    }

    #[test]
    fn test_commit_rejects_other_handle() {
        let session = Session::generate();
        let commit = session.sign_commit(&handle(), 0, b"content");
        let other = DocumentHandle::parse("sd1other").unwrap();

        assert!(verify_commit(&commit, &other, b"content").is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let session = Session::from_seed(&[1; 32]);
        let debug = format!("{:?}", session);
        assert!(debug.starts_with("Session(did:key:"));
    }
}
