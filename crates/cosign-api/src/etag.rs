//! ETag computation for document resources.
//!
//! ETags are SHA-256 hashes over the document id, its store version, and the
//! sorted `(signer_id, status)` pairs. Ordering is deterministic regardless of
//! signer insertion order.

use cosign_core::document::{Document, Versioned};
use sha2::{Digest, Sha256};

/// Compute a quoted ETag for a versioned document.
pub fn compute_etag(doc: &Versioned<Document>) -> String {
  let mut pairs: Vec<_> = doc
    .value
    .signers
    .iter()
    .map(|s| (s.signer_id, <&'static str>::from(s.status.canonical())))
    .collect();
  pairs.sort_by_key(|(id, _)| *id);

  let mut hasher = Sha256::new();
  hasher.update(doc.value.document_id.as_bytes());
  hasher.update(doc.version.to_le_bytes());
  hasher.update(<&'static str>::from(doc.value.status).as_bytes());
  for (id, status) in pairs {
    hasher.update(id.as_bytes());
    hasher.update(status.as_bytes());
  }
  let hash = hasher.finalize();
  format!("\"{}\"", hex::encode(hash))
}

/// Whether an `If-Match` header value matches `etag`. Accepts `*` and ETags
/// with or without surrounding quotes.
pub fn if_match_satisfied(header: &str, etag: &str) -> bool {
  header
    .split(',')
    .map(|candidate| candidate.trim())
    .any(|candidate| {
      candidate == "*" || strip_etag_quotes(candidate) == strip_etag_quotes(etag)
    })
}

fn strip_etag_quotes(s: &str) -> &str { s.trim_matches('"') }
