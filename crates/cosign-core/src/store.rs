//! The `DocumentStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `cosign-store-sqlite`).
//! Higher layers (`cosign-api`, [`crate::workflow`]) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::document::{Document, DocumentStatus, NewDocument, Versioned};

// ─── Commit outcome ──────────────────────────────────────────────────────────

/// Result of an optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
  /// The write landed; the document now has this version.
  Committed { version: u64 },
  /// Someone else committed first. Nothing was written.
  Conflict { current: u64 },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a document store backend.
///
/// Every write goes through [`DocumentStore::commit`], which only succeeds
/// against the version the caller read. Callers that get a
/// [`CommitOutcome::Conflict`] must re-read and re-check before trying
/// again; [`crate::workflow`] does exactly that.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create and persist a new `drafted` document with every signer
  /// `pending`. Ids and timestamps are assigned by the store.
  fn create_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<Versioned<Document>, Self::Error>> + Send + '_;

  /// Retrieve a document and its signers. Returns `None` if not found.
  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Versioned<Document>>, Self::Error>>
  + Send
  + '_;

  /// List all documents, optionally filtered by stored status.
  fn list_documents(
    &self,
    status: Option<DocumentStatus>,
  ) -> impl Future<Output = Result<Vec<Versioned<Document>>, Self::Error>>
  + Send
  + '_;

  /// Persist the document status and every signer's status and timestamps,
  /// but only if the stored version still equals `expected_version`.
  ///
  /// The document's name, policy and signer list are immutable after
  /// creation; only status fields are written.
  fn commit<'a>(
    &'a self,
    document: &'a Document,
    expected_version: u64,
  ) -> impl Future<Output = Result<CommitOutcome, Self::Error>> + Send + 'a;
}
