//! In-memory implementation of the DocumentStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! (signed commits, compare-and-swap, controller checks) but keeps
//! everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rand::RngCore;
use tracing::debug;

use sealdoc_core::{Blake3Hash, DocumentHandle, WireBundle};

use crate::error::{Result, StoreError};
use crate::session::{verify_commit, Commit, Session};
use crate::traits::{DocumentMetadata, DocumentStore, StoredDocument};

/// In-memory document store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryDocumentStore {
    session: Option<Session>,
    inner: RwLock<HashMap<DocumentHandle, StoredEntry>>,
}

struct StoredEntry {
    metadata: DocumentMetadata,
    /// Oldest first; index == version.
    versions: Vec<StoredVersion>,
}

struct StoredVersion {
    /// Serialized WireBundle, exactly as signed.
    content: String,
    commit: Commit,
}

impl MemoryDocumentStore {
    /// Create an empty store writing as `session`.
    pub fn new(session: Session) -> Self {
        Self {
            session: Some(session),
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty store with no session. Reads work, writes do not.
    pub fn unauthenticated() -> Self {
        Self {
            session: None,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents held.
    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<DocumentHandle, StoredEntry>>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<DocumentHandle, StoredEntry>>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn require_session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(StoreError::NotAuthenticated)
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new(Session::generate())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    async fn create(
        &self,
        content: &WireBundle,
        metadata: Option<&DocumentMetadata>,
    ) -> Result<DocumentHandle> {
        let session = self.require_session()?;
        let json = serde_json::to_string(content)?;

        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let handle = DocumentHandle::derive(
            session.controller(),
            &Blake3Hash::hash(json.as_bytes()),
            &nonce,
        );

        let commit = session.sign_commit(&handle, 0, json.as_bytes());
        let entry = StoredEntry {
            metadata: DocumentMetadata::resolve(metadata, session),
            versions: vec![StoredVersion {
                content: json,
                commit,
            }],
        };

        self.write()?.insert(handle.clone(), entry);
        debug!(handle = %handle, "created document");
        Ok(handle)
    }

    async fn load(&self, handle: &DocumentHandle) -> Result<StoredDocument> {
        let inner = self.read()?;
        let entry = inner
            .get(handle)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        let head = entry
            .versions
            .last()
            .ok_or_else(|| StoreError::InvalidData(format!("{handle} has no commits")))?;

        verify_commit(&head.commit, handle, head.content.as_bytes())?;
        let content: WireBundle = serde_json::from_str(&head.content)?;

        Ok(StoredDocument {
            handle: handle.clone(),
            version: head.commit.version,
            content,
            metadata: entry.metadata.clone(),
        })
    }

    async fn update(
        &self,
        handle: &DocumentHandle,
        content: &WireBundle,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let session = self.require_session()?;
        let json = serde_json::to_string(content)?;

        let mut inner = self.write()?;
        let entry = inner
            .get_mut(handle)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;

        if !entry.metadata.is_controller(session.controller()) {
            return Err(StoreError::Unauthorized {
                handle: handle.to_string(),
                controller: session.controller().to_string(),
            });
        }

        let head = entry.versions.len() as u64 - 1;
        if let Some(expected) = expected_version {
            if expected != head {
                return Err(StoreError::VersionConflict {
                    handle: handle.to_string(),
                    expected,
                    actual: head,
                });
            }
        }

        let version = head + 1;
        let commit = session.sign_commit(handle, version, json.as_bytes());
        entry.versions.push(StoredVersion {
            content: json,
            commit,
        });

        debug!(handle = %handle, version, "updated document");
        Ok(version)
    }

    async fn history(&self, handle: &DocumentHandle) -> Result<Vec<Commit>> {
        let inner = self.read()?;
        let entry = inner
            .get(handle)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        Ok(entry.versions.iter().map(|v| v.commit.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdoc_core::{AccessCondition, PolicyDescriptor, PolicyKind};

    fn bundle(tag: &str) -> WireBundle {
        WireBundle {
            ciphertext: format!("{tag}AAAA"),
            wrapped_key: "AAEC".into(),
            policy: PolicyDescriptor::standard(vec![AccessCondition::new("0x1", "balanceOf")]),
            chain: "ethereum".into(),
            policy_kind: PolicyKind::Standard,
        }
    }

    #[tokio::test]
    async fn test_create_and_load() {
        let store = MemoryDocumentStore::default();
        let handle = store.create(&bundle("a"), None).await.unwrap();

        let doc = store.load(&handle).await.unwrap();
        assert_eq!(doc.version, 0);
        assert_eq!(doc.content, bundle("a"));
        assert_eq!(doc.metadata.controllers, vec![store.session().unwrap().controller().to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_identical_content_distinct_handles() {
        let store = MemoryDocumentStore::default();
        let h1 = store.create(&bundle("a"), None).await.unwrap();
        let h2 = store.create(&bundle("a"), None).await.unwrap();
        assert_ne!(h1, h2);
    }

    #[tokio::test]
    async fn test_update_returns_next_version() {
        let store = MemoryDocumentStore::default();
        let handle = store.create(&bundle("a"), None).await.unwrap();

        assert_eq!(store.update(&handle, &bundle("b"), None).await.unwrap(), 1);
        assert_eq!(store.update(&handle, &bundle("c"), Some(1)).await.unwrap(), 2);

        let doc = store.load(&handle).await.unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.content, bundle("c"));

        let history = store.history(&handle).await.unwrap();
        let versions: Vec<u64> = history.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryDocumentStore::default();
        let handle = store.create(&bundle("a"), None).await.unwrap();
        store.update(&handle, &bundle("b"), Some(0)).await.unwrap();

        let err = store.update(&handle, &bundle("c"), Some(0)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { expected: 0, actual: 1, .. }
        ));

        // Nothing was written
        assert_eq!(store.load(&handle).await.unwrap().content, bundle("b"));
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let store = MemoryDocumentStore::default();
        let handle = DocumentHandle::parse("sd1missing").unwrap();

        assert!(matches!(store.load(&handle).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update(&handle, &bundle("a"), None).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unauthenticated_cannot_write() {
        let store = MemoryDocumentStore::unauthenticated();
        assert!(!store.is_authenticated());
        assert!(matches!(
            store.create(&bundle("a"), None).await,
            Err(StoreError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_non_controller_cannot_update() {
        let store = MemoryDocumentStore::default();
        let outsider = Session::generate();
        let metadata = DocumentMetadata::default().with_controller(outsider.controller());

        let handle = store.create(&bundle("a"), Some(&metadata)).await.unwrap();
        let err = store.update(&handle, &bundle("b"), None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_tampered_content_detected() {
        let store = MemoryDocumentStore::default();
        let handle = store.create(&bundle("a"), None).await.unwrap();

        {
            let mut inner = store.inner.write().unwrap();
            let entry = inner.get_mut(&handle).unwrap();
            entry.versions[0].content = serde_json::to_string(&bundle("evil")).unwrap();
        }

        assert!(matches!(store.load(&handle).await, Err(StoreError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_metadata_preserved() {
        let store = MemoryDocumentStore::default();
        let metadata = DocumentMetadata::default()
            .with_family("sealed-notes")
            .with_tag("demo");

        let handle = store.create(&bundle("a"), Some(&metadata)).await.unwrap();
        let doc = store.load(&handle).await.unwrap();

        assert_eq!(doc.metadata.family.as_deref(), Some("sealed-notes"));
        assert_eq!(doc.metadata.tags, vec!["demo".to_string()]);
        assert_eq!(doc.metadata.controllers.len(), 1);
    }
}
