//! # Sealdoc Store
//!
//! Versioned document storage for encrypted bundles. Provides a trait-based
//! interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store abstracts a mutable, versioned document network behind the
//! [`DocumentStore`] trait, so the orchestrator is storage-agnostic. The
//! persistent implementation is [`SqliteDocumentStore`], with
//! [`MemoryDocumentStore`] for testing.
//!
//! ## Key Types
//!
//! - [`DocumentStore`] - The async trait for create / load / update
//! - [`Session`] - The signing identity a store client writes with
//! - [`StoredDocument`] - Latest version of a document with its metadata
//! - [`Commit`] - One signed version of a document
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealdoc_store::{DocumentStore, Session, SqliteDocumentStore};
//!
//! async fn example() {
//!     let session = Session::generate();
//!     let store = SqliteDocumentStore::open("sealdoc.db", Some(session)).unwrap();
//!     assert!(store.is_authenticated());
//!
//!     // let handle = store.create(&wire_bundle, None).await.unwrap();
//!     // let doc = store.load(&handle).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only versions**: updates add a commit, the head moves forward
//! - **Compare-and-swap**: an expected version turns a stale write into `VersionConflict`
//! - **Controller checks**: only controllers named at creation may update
//! - **Signed commits**: tampering with stored content fails the next load

pub mod error;
pub mod memory;
pub mod migration;
pub mod session;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryDocumentStore;
pub use session::{Commit, CommitSignature, Session};
pub use sqlite::SqliteDocumentStore;
pub use traits::{DocumentMetadata, DocumentStore, StoredDocument};
