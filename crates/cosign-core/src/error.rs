//! Error types for `cosign-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::document::DocumentStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("signer not found: {0}")]
  SignerNotFound(Uuid),

  #[error("document has no signers")]
  NoSigners,

  #[error("cannot move document from {from} to {to}")]
  InvalidTransition {
    from: DocumentStatus,
    to:   DocumentStatus,
  },

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
