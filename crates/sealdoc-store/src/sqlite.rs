//! SQLite implementation of the DocumentStore trait.
//!
//! The persistent backend. It uses rusqlite with bundled SQLite, run on the
//! blocking pool via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use sealdoc_core::{Blake3Hash, DocumentHandle, WireBundle};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::session::{now_millis, verify_commit, Commit, CommitSignature, Session};
use crate::traits::{DocumentMetadata, DocumentStore, StoredDocument};

/// SQLite-based document store.
///
/// Thread-safe via internal Mutex.
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    session: Option<Session>,
}

impl SqliteDocumentStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>, session: Option<Session>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            session,
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory(session: Option<Session>) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            session,
        })
    }

    fn require_session(&self) -> Result<Session> {
        self.session.clone().ok_or(StoreError::NotAuthenticated)
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("mutex poisoned: {e}")))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }
}

fn insert_commit(conn: &Connection, handle: &DocumentHandle, content: &str, commit: &Commit) -> Result<()> {
    conn.execute(
        "INSERT INTO commits (handle, version, content, content_digest, author, signature, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            handle.as_str(),
            commit.version as i64,
            content,
            commit.content_digest.as_bytes().to_vec(),
            commit.author,
            commit.signature.0.to_vec(),
            commit.timestamp,
        ],
    )?;
    Ok(())
}

fn row_to_commit(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, Vec<u8>, String, Vec<u8>, i64)> {
    Ok((
        row.get("version")?,
        row.get("content_digest")?,
        row.get("author")?,
        row.get("signature")?,
        row.get("timestamp")?,
    ))
}

fn build_commit(raw: (i64, Vec<u8>, String, Vec<u8>, i64)) -> Result<Commit> {
    let (version, digest, author, signature, timestamp) = raw;
    let digest: [u8; 32] = digest
        .try_into()
        .map_err(|_| StoreError::InvalidData("content digest is not 32 bytes".into()))?;

    Ok(Commit {
        version: version as u64,
        content_digest: Blake3Hash(digest),
        author,
        signature: CommitSignature::try_from(signature.as_slice())?,
        timestamp,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
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
        let metadata = DocumentMetadata::resolve(metadata, &session);
        let metadata_json = serde_json::to_string(&metadata)?;

        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let handle = DocumentHandle::derive(
            session.controller(),
            &Blake3Hash::hash(json.as_bytes()),
            &nonce,
        );
        let commit = session.sign_commit(&handle, 0, json.as_bytes());

        let created = handle.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO documents (handle, metadata, head_version, created_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![created.as_str(), metadata_json, now_millis()],
            )?;
            insert_commit(&tx, &created, &json, &commit)?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        debug!(handle = %handle, "created document");
        Ok(handle)
    }

    async fn load(&self, handle: &DocumentHandle) -> Result<StoredDocument> {
        let handle = handle.clone();
        self.with_conn(move |conn| {
            let doc: Option<(String, i64)> = conn
                .query_row(
                    "SELECT metadata, head_version FROM documents WHERE handle = ?1",
                    params![handle.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (metadata_json, head) =
                doc.ok_or_else(|| StoreError::NotFound(handle.to_string()))?;

            let (content, raw): (String, _) = conn.query_row(
                "SELECT content, version, content_digest, author, signature, timestamp
                 FROM commits WHERE handle = ?1 AND version = ?2",
                params![handle.as_str(), head],
                |row| Ok((row.get("content")?, row_to_commit(row)?)),
            )?;
            let commit = build_commit(raw)?;

            verify_commit(&commit, &handle, content.as_bytes())?;

            Ok(StoredDocument {
                version: commit.version,
                content: serde_json::from_str(&content)?,
                metadata: serde_json::from_str(&metadata_json)?,
                handle,
            })
        })
        .await
    }

    async fn update(
        &self,
        handle: &DocumentHandle,
        content: &WireBundle,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let session = self.require_session()?;
        let json = serde_json::to_string(content)?;
        let handle = handle.clone();

        let version = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;

                let doc: Option<(String, i64)> = tx
                    .query_row(
                        "SELECT metadata, head_version FROM documents WHERE handle = ?1",
                        params![handle.as_str()],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let (metadata_json, head) =
                    doc.ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
                let head = head as u64;

                let metadata: DocumentMetadata = serde_json::from_str(&metadata_json)?;
                if !metadata.is_controller(session.controller()) {
                    return Err(StoreError::Unauthorized {
                        handle: handle.to_string(),
                        controller: session.controller().to_string(),
                    });
                }

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
                let commit = session.sign_commit(&handle, version, json.as_bytes());
                insert_commit(&tx, &handle, &json, &commit)?;
                tx.execute(
                    "UPDATE documents SET head_version = ?1 WHERE handle = ?2",
                    params![version as i64, handle.as_str()],
                )?;
                tx.commit()?;
                Ok(version)
            })
            .await?;

        debug!(version, "updated document");
        Ok(version)
    }

    async fn history(&self, handle: &DocumentHandle) -> Result<Vec<Commit>> {
        let handle = handle.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT version, content_digest, author, signature, timestamp
                 FROM commits WHERE handle = ?1 ORDER BY version",
            )?;
            let rows = stmt
                .query_map(params![handle.as_str()], row_to_commit)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            if rows.is_empty() {
                return Err(StoreError::NotFound(handle.to_string()));
            }
            rows.into_iter().map(build_commit).collect()
        })
        .await
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

    fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::open_memory(Some(Session::generate())).unwrap()
    }

    #[tokio::test]
    async fn test_create_load_update() {
        let store = store();
        let handle = store.create(&bundle("a"), None).await.unwrap();

        let doc = store.load(&handle).await.unwrap();
        assert_eq!(doc.version, 0);
        assert_eq!(doc.content, bundle("a"));

        let v = store.update(&handle, &bundle("b"), Some(0)).await.unwrap();
        assert_eq!(v, 1);
        assert_eq!(store.load(&handle).await.unwrap().content, bundle("b"));
    }

    #[tokio::test]
    async fn test_version_conflict_rolls_back() {
        let store = store();
        let handle = store.create(&bundle("a"), None).await.unwrap();
        store.update(&handle, &bundle("b"), None).await.unwrap();

        let err = store.update(&handle, &bundle("c"), Some(0)).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 0, actual: 1, .. }));

        let doc = store.load(&handle).await.unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.content, bundle("b"));
        assert_eq!(store.history(&handle).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_not_found() {
        let store = store();
        let handle = DocumentHandle::parse("sd1nothing").unwrap();
        assert!(matches!(store.load(&handle).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.history(&handle).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let store = SqliteDocumentStore::open_memory(None).unwrap();
        assert!(!store.is_authenticated());
        assert!(matches!(
            store.create(&bundle("a"), None).await,
            Err(StoreError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_tampered_row_detected() {
        let store = store();
        let handle = store.create(&bundle("a"), None).await.unwrap();

        {
            let conn = store.conn.lock().unwrap();
            let evil = serde_json::to_string(&bundle("evil")).unwrap();
            conn.execute(
                "UPDATE commits SET content = ?1 WHERE handle = ?2",
                params![evil, handle.as_str()],
            )
            .unwrap();
        }

        assert!(matches!(store.load(&handle).await, Err(StoreError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");
        let session = Session::from_seed(&[9; 32]);

        let handle = {
            let store = SqliteDocumentStore::open(&path, Some(session.clone())).unwrap();
            let handle = store.create(&bundle("a"), None).await.unwrap();
            store.update(&handle, &bundle("b"), Some(0)).await.unwrap();
            handle
        };

        let reopened = SqliteDocumentStore::open(&path, Some(session)).unwrap();
        let doc = reopened.load(&handle).await.unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.content, bundle("b"));

        // Same controller can keep writing after reopen
        assert_eq!(reopened.update(&handle, &bundle("c"), Some(1)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_other_session_cannot_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");

        let handle = {
            let store = SqliteDocumentStore::open(&path, Some(Session::generate())).unwrap();
            store.create(&bundle("a"), None).await.unwrap()
        };

        let intruder = SqliteDocumentStore::open(&path, Some(Session::generate())).unwrap();
        // Reads are open to anyone
        assert!(intruder.load(&handle).await.is_ok());
        assert!(matches!(
            intruder.update(&handle, &bundle("b"), None).await,
            Err(StoreError::Unauthorized { .. })
        ));
    }
}
