//! DocumentStore trait: the abstract interface for versioned bundle storage.
//!
//! Sealdoc never talks to a concrete document network. It needs create,
//! load-latest, and update on an opaque handle, and this trait is exactly
//! that. Implementations include SQLite and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sealdoc_core::{DocumentHandle, WireBundle};

use crate::error::Result;
use crate::session::{Commit, Session};

/// Creation-time metadata of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Controller ids allowed to update the document. Empty means the
    /// creating session alone.
    #[serde(default)]
    pub controllers: Vec<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

impl DocumentMetadata {
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_controller(mut self, controller: impl Into<String>) -> Self {
        self.controllers.push(controller.into());
        self
    }

    /// Fill in the default controller if none were given.
    pub(crate) fn resolve(metadata: Option<&DocumentMetadata>, session: &Session) -> Self {
        let mut resolved = metadata.cloned().unwrap_or_default();
        if resolved.controllers.is_empty() {
            resolved.controllers.push(session.controller().to_string());
        }
        resolved
    }

    pub fn is_controller(&self, controller: &str) -> bool {
        self.controllers.iter().any(|c| c == controller)
    }
}

/// The latest version of a document, as loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub handle: DocumentHandle,
    /// Version of `content`; 0 is the genesis.
    pub version: u64,
    pub content: WireBundle,
    pub metadata: DocumentMetadata,
}

/// Async interface to a mutable, versioned document store.
///
/// # Design Notes
///
/// - **Versions are append-only**: an update writes a new commit on top of
///   the head, older commits stay readable through [`DocumentStore::history`].
/// - **Compare-and-swap**: `update` with `Some(expected)` fails with
///   `VersionConflict` if the head moved. `None` is last-writer-wins.
/// - **Signed commits**: every commit is signed by the writing session and
///   checked on load.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The session writes are signed with, if one is established.
    fn session(&self) -> Option<&Session>;

    /// Whether writes can be made through this store.
    fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Create a document holding `content` as its genesis.
    async fn create(
        &self,
        content: &WireBundle,
        metadata: Option<&DocumentMetadata>,
    ) -> Result<DocumentHandle>;

    /// Load the latest version of a document.
    async fn load(&self, handle: &DocumentHandle) -> Result<StoredDocument>;

    /// Write `content` as the next version.
    ///
    /// Returns the new version number.
    async fn update(
        &self,
        handle: &DocumentHandle,
        content: &WireBundle,
        expected_version: Option<u64>,
    ) -> Result<u64>;

    /// Every commit of a document, oldest first.
    async fn history(&self, handle: &DocumentHandle) -> Result<Vec<Commit>>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn session(&self) -> Option<&Session> {
        (**self).session()
    }

    async fn create(
        &self,
        content: &WireBundle,
        metadata: Option<&DocumentMetadata>,
    ) -> Result<DocumentHandle> {
        (**self).create(content, metadata).await
    }

    async fn load(&self, handle: &DocumentHandle) -> Result<StoredDocument> {
        (**self).load(handle).await
    }

    async fn update(
        &self,
        handle: &DocumentHandle,
        content: &WireBundle,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        (**self).update(handle, content, expected_version).await
    }

    async fn history(&self, handle: &DocumentHandle) -> Result<Vec<Commit>> {
        (**self).history(handle).await
    }
}
