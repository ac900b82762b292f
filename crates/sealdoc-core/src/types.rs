//! Identifier and hash newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A 32-byte Blake3 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    /// Compute the Blake3 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The zero hash (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blake3({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Blake3Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Blake3Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Opaque identifier of a stored document.
///
/// Returned by the store on creation and owned by the caller from then on.
/// Nothing in Sealdoc caches handles.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentHandle(String);

impl DocumentHandle {
    /// Prefix of handles minted by Sealdoc stores.
    pub const PREFIX: &'static str = "sd1";

    /// Derive a fresh handle from the genesis of a document.
    ///
    /// `nonce` makes two documents with identical genesis content distinct.
    pub fn derive(controller: &str, genesis: &Blake3Hash, nonce: &[u8; 16]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"sealdoc-document-v1:");
        hasher.update(controller.as_bytes());
        hasher.update(b":");
        hasher.update(&genesis.0);
        hasher.update(nonce);
        Self(format!("{}{}", Self::PREFIX, hasher.finalize().to_hex()))
    }

    /// Wrap an identifier issued by some store.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidHandle("empty handle".into()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidHandle(format!("whitespace in handle {trimmed:?}")));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentHandle({})", self.0)
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentHandle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentHandle {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DocumentHandle> for String {
    fn from(handle: DocumentHandle) -> Self {
        handle.0
    }
}

impl AsRef<str> for DocumentHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display_roundtrip() {
        let handle = DocumentHandle::derive("did:key:abc", &Blake3Hash::hash(b"genesis"), &[7; 16]);
        let parsed: DocumentHandle = handle.to_string().parse().unwrap();
        assert_eq!(handle, parsed);
        assert!(handle.as_str().starts_with(DocumentHandle::PREFIX));
    }

    #[test]
    fn test_handle_serde_validates() {
        let handle = DocumentHandle::derive("did:key:abc", &Blake3Hash::hash(b"genesis"), &[7; 16]);
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{handle}\""));
        assert_eq!(serde_json::from_str::<DocumentHandle>(&json).unwrap(), handle);

        for bad in [r#""""#, r#""   ""#, r#""sd1 abc""#] {
            assert!(serde_json::from_str::<DocumentHandle>(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_handle_nonce_distinguishes() {
        let genesis = Blake3Hash::hash(b"same content");
        let a = DocumentHandle::derive("did:key:abc", &genesis, &[1; 16]);
        let b = DocumentHandle::derive("did:key:abc", &genesis, &[2; 16]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_handle_parse_rejects_empty() {
        assert!(DocumentHandle::parse("").is_err());
        assert!(DocumentHandle::parse("   ").is_err());
        assert!(DocumentHandle::parse("a b").is_err());
    }

    #[test]
    fn test_foreign_handles_accepted() {
        // Stores may issue identifiers in their own format.
        let handle = DocumentHandle::parse("kjzl6cwe1jw147").unwrap();
        assert_eq!(handle.as_str(), "kjzl6cwe1jw147");
    }

    #[test]
    fn test_blake3_debug() {
        let h = Blake3Hash::from_bytes([0xcd; 32]);
        assert_eq!(format!("{:?}", h), "Blake3(cdcdcdcdcdcdcdcd)");
    }
}
