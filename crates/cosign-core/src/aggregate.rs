//! Document status aggregator.

use crate::{
  document::DocumentStatus,
  signer::{Signer, SignerStatus},
};

/// Derive a document's status from its signers. First match wins:
///
/// 1. no signers → `drafted`
/// 2. any signer declined → `declined` (sticky, even if others signed later)
/// 3. every signer signed → `signed`
/// 4. otherwise → `waiting`
///
/// Never returns `expired`; expiry is decided outside the engine.
pub fn aggregate_status(signers: &[Signer]) -> DocumentStatus {
  if signers.is_empty() {
    DocumentStatus::Drafted
  } else if signers.iter().any(|s| s.status == SignerStatus::Declined) {
    DocumentStatus::Declined
  } else if signers.iter().all(|s| s.status == SignerStatus::Signed) {
    DocumentStatus::Signed
  } else {
    DocumentStatus::Waiting
  }
}

/// `true` once the signers alone put the document in a terminal status.
pub fn is_complete(signers: &[Signer]) -> bool {
  aggregate_status(signers).is_terminal()
}
