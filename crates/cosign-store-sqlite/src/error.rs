//! Error type for `cosign-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cosign_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to commit a document that was never created.
  #[error("document not found: {0}")]
  DocumentNotFound(uuid::Uuid),

  /// Signer rows in a commit must match the rows created with the document.
  #[error("signer {signer_id} does not belong to document {document_id}")]
  ForeignSigner {
    document_id: uuid::Uuid,
    signer_id:   uuid::Uuid,
  },

  /// A commit tried to move a signer out of `signed` or `declined`.
  #[error("signer {signer_id} has already {status}")]
  SignerSettled {
    signer_id: uuid::Uuid,
    status:    cosign_core::signer::SignerStatus,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
